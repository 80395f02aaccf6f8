use std::sync::Mutex;

use crate::error::{ErrorKind, UrosError, UrosResult};

/// Fixed block-count free-list pool. Allocations never split a block;
/// `alloc` fails with `NoMemory` once the free list is empty. Concurrent
/// access is guarded by a single mutex, matching the source design's
/// embedded intrusive free list.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T> Pool<T> {
    /// Builds a pool pre-populated with `capacity` blocks produced by
    /// `make`. `capacity` is fixed for the pool's lifetime.
    pub fn new(capacity: usize, mut make: impl FnMut() -> T) -> Self {
        let mut free = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            free.push(make());
        }
        Self { free: Mutex::new(free), capacity }
    }

    /// Takes one block out of the free list, or fails with `NoMemory`.
    pub fn alloc(&self) -> UrosResult<T> {
        let mut free = self.free.lock().expect("pool mutex poisoned");
        free.pop().ok_or_else(|| UrosError::new(ErrorKind::NoMemory, "pool exhausted"))
    }

    /// Returns a block to the pool. The caller is responsible for not
    /// double-freeing: every block allocated is expected to be freed
    /// exactly once, by the same pool.
    pub fn free(&self, block: T) {
        let mut free = self.free.lock().expect("pool mutex poisoned");
        free.push(block);
    }

    /// Number of blocks currently available.
    pub fn count(&self) -> usize {
        self.free.lock().expect("pool mutex poisoned").len()
    }

    /// Total block capacity of the pool.
    pub fn size(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_exhausts_then_free_replenishes() {
        let pool = Pool::new(2, || Vec::<u8>::with_capacity(64));
        assert_eq!(pool.count(), 2);

        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert_eq!(pool.count(), 0);

        assert!(matches!(pool.alloc(), Err(e) if e.kind == ErrorKind::NoMemory));

        pool.free(a);
        assert_eq!(pool.count(), 1);
        pool.free(b);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn size_is_stable_across_alloc_free() {
        let pool = Pool::new(4, || 0u32);
        assert_eq!(pool.size(), 4);
        let block = pool.alloc().unwrap();
        assert_eq!(pool.size(), 4);
        pool.free(block);
        assert_eq!(pool.size(), 4);
    }
}
