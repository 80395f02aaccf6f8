use std::sync::{Condvar, Mutex};

/// Counting semaphore. `std` has no built-in equivalent; this is the one
/// primitive from the threading abstraction that is not a thin re-export
/// of a `std::sync` type.
pub struct Semaphore {
    count: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(initial: usize) -> Self {
        Self { count: Mutex::new(initial), cv: Condvar::new() }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn wait(&self) {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        while *count == 0 {
            count = self.cv.wait(count).expect("semaphore mutex poisoned");
        }
        *count -= 1;
    }

    /// Takes a permit only if one is immediately available.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Releases one permit, waking a single waiter if any.
    pub fn signal(&self) {
        let mut count = self.count.lock().expect("semaphore mutex poisoned");
        *count += 1;
        self.cv.notify_one();
    }

    pub fn available(&self) -> usize {
        *self.count.lock().expect("semaphore mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn try_wait_fails_when_empty() {
        let sem = Semaphore::new(0);
        assert!(!sem.try_wait());
        sem.signal();
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn wait_blocks_until_signal() {
        let sem = Arc::new(Semaphore::new(0));
        let sem2 = Arc::clone(&sem);
        let handle = thread::spawn(move || {
            sem2.wait();
        });
        thread::sleep(Duration::from_millis(20));
        sem.signal();
        handle.join().unwrap();
    }
}
