//! The TCPROS wire protocol: handshake header codec, length-prefixed
//! framing, and the four session state machines (publisher accept,
//! subscriber connect, service server, service caller).

mod error;
mod framing;
mod header;
mod publisher;
mod service;
mod session;
mod subscriber;

pub use error::{TcprosError, TcprosResult};
pub use framing::{read_message, read_u32, write_message, write_u32};
pub use header::{Header, MAX_HEADER_BLOCK};
pub use publisher::{accept_publisher_session, accept_publisher_session_with_header};
pub use service::{accept_service_session, accept_service_session_with_header, ServiceCaller};
pub use session::Session;
pub use subscriber::connect_subscriber_session;
