//! Memory Stock
//!
//! Shared state behind a pool: counters, the idle list and the wait condition.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Shared state of a memory pool
///
/// ## Locking
/// - `idle`: guards the list of idle chunks only
/// - `wait_lock` + `available`: guard the blocking condition only
///
/// A releaser publishes the chunk (or the lowered allocation) first and only
/// then takes `wait_lock` to notify, so a waiter that checked the list while
/// holding `wait_lock` cannot miss the wake-up.
pub(crate) struct MemoryStock {
    pub(crate) chunk_size: AtomicUsize,
    pub(crate) max_memory: AtomicUsize,
    pub(crate) in_use: AtomicUsize,
    pub(crate) allocated: AtomicUsize,
    pub(crate) max_in_use: AtomicUsize,

    pub(crate) idle: Mutex<Vec<Box<[u8]>>>,

    wait_lock: Mutex<()>,
    available: Condvar,
}

impl MemoryStock {
    pub(crate) fn new(chunk_size: usize, max_memory: usize) -> Self {
        Self {
            chunk_size: AtomicUsize::new(chunk_size),
            max_memory: AtomicUsize::new(max_memory.max(chunk_size)),
            in_use: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
            max_in_use: AtomicUsize::new(0),
            idle: Mutex::new(Vec::new()),
            wait_lock: Mutex::new(()),
            available: Condvar::new(),
        }
    }

    /// Hand out a chunk, waiting for one if `block` is set
    ///
    /// Returns `None` only when `block` is false and the pool is exhausted.
    pub(crate) fn pop(&self, block: bool) -> Option<Box<[u8]>> {
        if let Some(mem) = self.try_pop() {
            return Some(mem);
        }
        if !block {
            return None;
        }

        // No idle chunk and the next allocation would exceed the ceiling:
        // wait until a chunk comes back
        let mut guard = self.wait_lock.lock();
        loop {
            if let Some(mem) = self.try_pop() {
                return Some(mem);
            }
            self.available.wait(&mut guard);
        }
    }

    fn try_pop(&self) -> Option<Box<[u8]>> {
        let chunk_size = self.chunk_size.load(Ordering::Acquire);

        let idle = self.idle.lock().pop();
        let mem = match idle {
            Some(mem) => mem,
            None => {
                if !self.reserve(chunk_size) {
                    return None;
                }
                trace!(chunk_size, "Allocating new chunk");
                vec![0u8; chunk_size].into_boxed_slice()
            }
        };

        let in_use = self.in_use.fetch_add(mem.len(), Ordering::AcqRel) + mem.len();
        self.max_in_use.fetch_max(in_use, Ordering::AcqRel);

        Some(mem)
    }

    /// Account for a new allocation if it fits under the ceiling
    fn reserve(&self, size: usize) -> bool {
        let max = self.max_memory.load(Ordering::Acquire);
        let mut current = self.allocated.load(Ordering::Acquire);
        loop {
            match current.checked_add(size) {
                Some(next) if next <= max => {}
                _ => return false,
            }
            match self.allocated.compare_exchange_weak(
                current,
                current + size,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Take a chunk back from its holder
    pub(crate) fn push(&self, mem: Box<[u8]>) {
        let size = mem.len();
        self.in_use.fetch_sub(size, Ordering::AcqRel);

        if self.release_over_limit(size) {
            // The ceiling was lowered: free this slot instead of keeping it
            trace!(size, "Dropping chunk above memory limit");
            drop(mem);
        } else {
            self.idle.lock().push(mem);
        }

        let _guard = self.wait_lock.lock();
        self.available.notify_one();
    }

    /// Decrement `allocated` by `size` if the pool is over its ceiling
    fn release_over_limit(&self, size: usize) -> bool {
        let max = self.max_memory.load(Ordering::Acquire);
        let mut current = self.allocated.load(Ordering::Acquire);
        loop {
            if current <= max {
                return false;
            }
            match self.allocated.compare_exchange_weak(
                current,
                current.saturating_sub(size),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Free idle chunks until `allocated` fits under `limit`
    ///
    /// With `limit == 0` every idle chunk is freed. Returns the number of
    /// chunks dropped.
    pub(crate) fn trim_idle(&self, limit: usize) -> usize {
        let mut idle = self.idle.lock();
        let mut dropped = 0;
        while self.allocated.load(Ordering::Acquire) > limit {
            match idle.pop() {
                Some(mem) => {
                    self.allocated.fetch_sub(mem.len(), Ordering::AcqRel);
                    dropped += 1;
                }
                None => break,
            }
        }
        dropped
    }

    /// Wake every waiter, e.g. after the ceiling was raised
    pub(crate) fn notify_all(&self) {
        let _guard = self.wait_lock.lock();
        self.available.notify_all();
    }
}
