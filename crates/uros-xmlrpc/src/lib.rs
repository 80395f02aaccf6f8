//! Streaming XML-RPC codec and HTTP framing for the Master/Slave APIs.
//!
//! This is deliberately not a general-purpose XML-RPC library: it covers
//! exactly the value kinds and method shapes those two APIs use, parsed
//! with a hand-rolled recursive-descent reader over a bounded buffer
//! rather than a DOM, matching the narrow-subset-over-general-library
//! stance the rest of this workspace takes for wire formats it owns both
//! ends of.

mod base64;
mod codec;
mod error;
mod http;
mod value;

pub use codec::{parse_method_call, parse_method_response, write_method_call, write_method_response};
pub use error::{XmlRpcError, XmlRpcResult};
pub use http::{read_request, read_response, write_request, write_response};
pub use value::{MethodCall, Reply, Value};
