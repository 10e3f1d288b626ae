//! Memory Pool Module
//!
//! Bounded, thread-safe allocator of fixed-size byte chunks.
//!
//! ## Responsibilities
//! - Cap the memory committed to in-flight event buffers
//! - Reuse idle chunks without a fresh allocation
//! - Blocking (backpressure) and non-blocking acquisition
//! - Automatic return of a chunk when its holder drops it
//!
//! ## Chunk Lifecycle
//! ```text
//!            acquire                 drop
//!   ┌──────┐ ───────▶ ┌────────┐ ──────────▶ ┌──────┐
//!   │ Idle │          │ InUse  │             │ Idle │
//!   └──────┘          └────────┘             └──────┘
//!                          │ drop while allocated > max_memory
//!                          ▼
//!                     ┌─────────┐
//!                     │ Dropped │
//!                     └─────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use evtstore::pool::MemoryPool;
//!
//! let pool = MemoryPool::new(1024, 4096);
//! let chunk = pool.try_acquire().unwrap();
//! assert_eq!(pool.in_use(), 1024);
//!
//! drop(chunk);
//! assert_eq!(pool.in_use(), 0);
//! assert_eq!(pool.allocated(), 1024);
//! ```

mod chunk;
mod stock;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::{Result, StoreError};

pub use chunk::MemoryChunk;
use stock::MemoryStock;

/// Snapshot of the pool counters (monitoring only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub chunk_size: usize,
    pub max_memory: usize,
    pub allocated: usize,
    pub in_use: usize,
    pub max_in_use: usize,
    pub idle_chunks: usize,
}

/// Handle on a shared chunk pool
///
/// Cloning is cheap and yields another handle on the same pool, so producers
/// on several threads can each hold one.
///
/// ## Concurrency:
/// - `acquire`/release: safe from any number of threads
/// - `acquire(true)` is the only call that suspends; it waits without timeout
/// - `set_chunk_size`/`set_max_memory`: meant for setup, not for racing with
///   acquirers
#[derive(Clone)]
pub struct MemoryPool {
    stock: Arc<MemoryStock>,
}

impl MemoryPool {
    /// Create a pool of `chunk_size` chunks capped at `max_memory` bytes
    ///
    /// A `max_memory` below `chunk_size` is raised to one chunk.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(chunk_size: usize, max_memory: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self {
            stock: Arc::new(MemoryStock::new(chunk_size, max_memory)),
        }
    }

    /// Create a pool from the configured chunk size and ceiling
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.pool_chunk_size, config.pool_max_memory))
    }

    /// Get a chunk
    ///
    /// Order of preference:
    /// 1. An idle chunk from the free list
    /// 2. A new allocation, if it stays under `max_memory`
    /// 3. If `block`: wait for a release; else return `None`
    pub fn acquire(&self, block: bool) -> Option<MemoryChunk> {
        self.stock
            .pop(block)
            .map(|data| MemoryChunk::new(data, Arc::clone(&self.stock)))
    }

    /// Get a chunk, waiting as long as it takes
    pub fn acquire_blocking(&self) -> MemoryChunk {
        let data = loop {
            if let Some(data) = self.stock.pop(true) {
                break data;
            }
        };
        MemoryChunk::new(data, Arc::clone(&self.stock))
    }

    /// Get a chunk if one is available right now
    pub fn try_acquire(&self) -> Option<MemoryChunk> {
        self.acquire(false)
    }

    /// Change the chunk size
    ///
    /// Only allowed while no chunk is in use. Idle chunks of the old size are
    /// freed.
    pub fn set_chunk_size(&self, size: usize) -> Result<()> {
        let in_use = self.in_use();
        if in_use > 0 {
            return Err(StoreError::PoolBusy { in_use });
        }

        if size == 0 {
            return Err(StoreError::EmptyChunk);
        }
        let max = self.max_memory();
        if size > max {
            return Err(StoreError::ChunkTooLarge { size, max });
        }

        let freed = self.stock.trim_idle(0);
        self.stock.chunk_size.store(size, Ordering::Release);
        debug!(size, freed, "Chunk size changed");

        Ok(())
    }

    /// Change the memory ceiling
    ///
    /// Lowering it frees idle chunks right away; chunks in use are freed when
    /// they come back, until the allocation fits under the new ceiling.
    pub fn set_max_memory(&self, max: usize) -> Result<()> {
        let chunk = self.chunk_size();
        if max < chunk {
            return Err(StoreError::MemoryLimitTooSmall { max, chunk });
        }

        let previous = self.stock.max_memory.swap(max, Ordering::AcqRel);
        if max < previous {
            let freed = self.stock.trim_idle(max);
            debug!(previous, max, freed, "Memory ceiling lowered");
        } else {
            debug!(previous, max, "Memory ceiling raised");
        }

        self.stock.notify_all();
        Ok(())
    }

    // =========================================================================
    // Accessors (monitoring only)
    // =========================================================================

    pub fn chunk_size(&self) -> usize {
        self.stock.chunk_size.load(Ordering::Acquire)
    }

    pub fn max_memory(&self) -> usize {
        self.stock.max_memory.load(Ordering::Acquire)
    }

    /// Bytes currently held by callers
    pub fn in_use(&self) -> usize {
        self.stock.in_use.load(Ordering::Acquire)
    }

    /// Bytes currently allocated, idle or not
    pub fn allocated(&self) -> usize {
        self.stock.allocated.load(Ordering::Acquire)
    }

    /// Highest `in_use` observed so far
    pub fn max_in_use(&self) -> usize {
        self.stock.max_in_use.load(Ordering::Acquire)
    }

    /// Number of chunks waiting in the free list
    pub fn idle_chunks(&self) -> usize {
        self.stock.idle.lock().len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            chunk_size: self.chunk_size(),
            max_memory: self.max_memory(),
            allocated: self.allocated(),
            in_use: self.in_use(),
            max_in_use: self.max_in_use(),
            idle_chunks: self.idle_chunks(),
        }
    }
}

impl std::fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPool").field("stats", &self.stats()).finish()
    }
}
