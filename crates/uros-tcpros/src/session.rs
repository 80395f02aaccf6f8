//! The object handed to application publisher/subscriber/service routines:
//! the live connection plus the cooperative exit flag they must check
//! between iterations and after every blocking I/O return.

use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};

use uros_net::Connection;

pub struct Session {
    pub id: u64,
    pub name: String,
    pub conn: Connection,
    exit: Arc<AtomicBool>,
}

impl Session {
    pub fn new(id: u64, name: String, conn: Connection, exit: Arc<AtomicBool>) -> Self {
        Self { id, name, conn, exit }
    }

    /// True once the owning supervisor (or this session's own abort path)
    /// has requested a stop. Application routines must poll this between
    /// message iterations.
    pub fn should_exit(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    pub fn exit_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exit)
    }
}
