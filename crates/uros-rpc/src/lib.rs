//! Slave-API dispatch and Master-client calls built on the XML-RPC codec
//! and the registry. Neither side retries; a failed call is surfaced to
//! its caller exactly once.

mod master;
mod slave;

pub use master::MasterClient;
pub use slave::{dispatch, SlaveHandler};
