//! The node supervisor crate: ties the registry, Slave-API dispatch and
//! TCPROS session state machines from the rest of the workspace into one
//! boot/drain lifecycle with its own listener threads and worker pools.

mod callbacks;
mod config;
mod node;

pub use callbacks::AppCallbacks;
pub use config::{AddressConfig, NodeConfig};
pub use node::{Node, NodeState};
