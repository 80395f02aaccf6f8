//! Threading abstraction: OS thread priority/affinity helpers and a
//! bounded thread pool with synchronous rendezvous handoff.
//!
//! `Mutex` and `Condvar` are used directly from `std::sync` throughout the
//! rest of the workspace — there is nothing to add over them here. The one
//! primitive `std` doesn't provide is a counting semaphore, so that's the
//! other thing this crate exports.

mod pool;
mod priority;
mod semaphore;

pub use pool::{Job, PoolConfig, ThreadPool};
pub use priority::{thread_boot, ThreadPriority};
pub use semaphore::Semaphore;
