//! Base primitives for the uros node runtime: byte-counted strings, a
//! bounded memory pool, error kinds, IPv4 address parsing, and the small
//! name/type records the registry and engine build on.

mod address;
mod error;
mod pool;
mod types;
mod ustring;

pub use address::{parse_ipv4_literal, read_le32, write_le32, Address};
pub use error::{ErrorKind, UrosError, UrosResult};
pub use pool::Pool;
pub use types::{
    require, NameRecord, NodeName, ParamEntry, ParamValue, PeerAddress, ServiceRole,
    TopicFlags, TopicRole, TypeDescriptor,
};
pub use ustring::UString;
