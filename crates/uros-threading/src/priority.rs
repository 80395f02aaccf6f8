use core_affinity::CoreId;
#[cfg(target_os = "linux")]
use libc::{sched_param, sched_setscheduler, SCHED_FIFO};
use tracing::warn;

/// Any variant other than `OsDefault` requests `SCHED_FIFO` realtime
/// scheduling if the process has permission (`CAP_SYS_NICE`). If setting
/// the policy fails, execution continues under the OS default scheduler.
#[derive(Clone, Copy, Debug)]
pub enum ThreadPriority {
    OsDefault,
    Low,
    Medium,
    High,
    Custom(i32),
}

#[cfg(target_os = "linux")]
impl ThreadPriority {
    fn to_sched_param(self) -> Option<sched_param> {
        let prio = match self {
            ThreadPriority::OsDefault => return None,
            ThreadPriority::Low => 10,
            ThreadPriority::Medium => 25,
            ThreadPriority::High => 50,
            ThreadPriority::Custom(p) => p,
        };
        Some(sched_param { sched_priority: prio })
    }
}

#[cfg(target_os = "linux")]
fn set_thread_prio(prio: ThreadPriority) {
    if let Some(param) = prio.to_sched_param() {
        unsafe {
            let code = sched_setscheduler(0, SCHED_FIFO, &param);
            if code != 0 {
                warn!(?param, "couldn't set thread priority, staying on OS default scheduler");
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn set_thread_prio(prio: ThreadPriority) {
    if !matches!(prio, ThreadPriority::OsDefault) {
        warn!(?prio, "thread priority setting only supported on linux");
    }
}

fn set_thread_affinity(core: usize) {
    if !core_affinity::set_for_current(CoreId { id: core }) {
        warn!(?core, "couldn't set core affinity");
    }
}

/// Called at the top of every pool worker and listener thread: pins to a
/// core if one was requested, then attempts the priority change. Failure
/// of either is a warning, never fatal — the thread keeps running.
pub fn thread_boot(core: Option<usize>, prio: ThreadPriority) {
    if let Some(core) = core {
        set_thread_affinity(core);
    }
    set_thread_prio(prio);
}
