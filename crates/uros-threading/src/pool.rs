use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{sync_channel, Receiver, SyncSender},
        Arc, Condvar, Mutex,
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, trace};

use crate::priority::{thread_boot, ThreadPriority};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Static configuration for a [`ThreadPool`]: worker count, stack size and
/// scheduling hints applied to every spawned worker thread.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    pub size: usize,
    pub stack_size: usize,
    pub priority: ThreadPriority,
    /// First core a worker is pinned to; worker `i` is pinned to
    /// `core_base + i` when set, matching one tile per worker.
    pub core_base: Option<usize>,
}

impl PoolConfig {
    pub fn new(size: usize) -> Self {
        Self { size, stack_size: 256 * 1024, priority: ThreadPriority::OsDefault, core_base: None }
    }
}

/// Bounded thread pool with synchronous rendezvous handoff: `dispatch`
/// blocks until an idle worker exists, hands it the job over a
/// zero-capacity channel (so the send only returns once the worker has
/// taken ownership of the job), and returns. Workers cycle
/// IDLE -> BUSY -> IDLE; `join_all` requests every worker to exit and
/// waits for them to drain.
pub struct ThreadPool {
    size: usize,
    senders: Vec<Option<SyncSender<Job>>>,
    ready: Arc<Mutex<VecDeque<usize>>>,
    ready_cv: Arc<Condvar>,
    exit: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `config.size` workers, each immediately blocking on its
    /// handoff slot until exit is requested or a job arrives.
    pub fn create(config: PoolConfig, name: &'static str) -> Self {
        let ready = Arc::new(Mutex::new(VecDeque::with_capacity(config.size)));
        let ready_cv = Arc::new(Condvar::new());
        let exit = Arc::new(AtomicBool::new(false));

        let mut senders = Vec::with_capacity(config.size);
        let mut handles = Vec::with_capacity(config.size);

        for id in 0..config.size {
            let (tx, rx) = sync_channel::<Job>(0);
            senders.push(Some(tx));

            let ready = Arc::clone(&ready);
            let ready_cv = Arc::clone(&ready_cv);
            let exit = Arc::clone(&exit);
            let core = config.core_base.map(|base| base + id);
            let priority = config.priority;

            let handle = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .stack_size(config.stack_size)
                .spawn(move || worker_loop(id, rx, ready, ready_cv, exit, core, priority))
                .expect("failed to spawn pool worker");
            handles.push(handle);
        }

        Self { size: config.size, senders, ready, ready_cv, exit, handles }
    }

    /// Blocks until an idle worker is available, then hands it `job`.
    /// Returns only once the worker has copied the job out of the
    /// handoff slot — the dispatcher never observes a worker as "taken"
    /// before that happens.
    pub fn dispatch(&self, job: Job) {
        let mut ready = self.ready.lock().expect("pool ready mutex poisoned");
        loop {
            if self.exit.load(Ordering::Acquire) {
                debug!("pool dispatch called after join_all, dropping job");
                return;
            }
            if let Some(id) = ready.pop_front() {
                drop(ready);
                trace!(worker = id, "dispatching job");
                if let Some(sender) = &self.senders[id] {
                    // send on a zero-capacity channel blocks until the
                    // worker's recv() takes ownership: the rendezvous.
                    let _ = sender.send(job);
                }
                return;
            }
            ready = self.ready_cv.wait(ready).expect("pool ready mutex poisoned");
        }
    }

    /// Number of workers currently idle (in the ready set).
    pub fn ready_count(&self) -> usize {
        self.ready.lock().expect("pool ready mutex poisoned").len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Marks exit requested and wakes every worker by dropping its
    /// sender (causing the blocked `recv()` to return an error), then
    /// joins every worker thread.
    pub fn join_all(mut self) {
        self.exit.store(true, Ordering::Release);
        self.ready_cv.notify_all();
        for sender in self.senders.iter_mut() {
            *sender = None;
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    id: usize,
    rx: Receiver<Job>,
    ready: Arc<Mutex<VecDeque<usize>>>,
    ready_cv: Arc<Condvar>,
    exit: Arc<AtomicBool>,
    core: Option<usize>,
    priority: ThreadPriority,
) {
    thread_boot(core, priority);

    loop {
        {
            let mut ready = ready.lock().expect("pool ready mutex poisoned");
            ready.push_back(id);
            ready_cv.notify_all();
        }

        match rx.recv() {
            Ok(job) => {
                trace!(worker = id, "worker busy");
                job();
            }
            Err(_) => {
                // sender dropped by join_all: exit requested.
                debug!(worker = id, "worker exiting");
                break;
            }
        }

        if exit.load(Ordering::Acquire) {
            break;
        }
    }
}
