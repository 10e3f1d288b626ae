//! Tests for single-threaded pool behaviour
//!
//! These tests verify:
//! - Accounting of allocated and in-use bytes
//! - Reuse of idle chunks
//! - Non-blocking exhaustion
//! - Chunk size and ceiling changes

use evtstore::pool::MemoryPool;
use evtstore::{Config, StoreError};

// =============================================================================
// Acquire / Release
// =============================================================================

#[test]
fn test_four_chunks_fill_the_pool() {
    let pool = MemoryPool::new(1024, 4096);

    let chunks: Vec<_> = (0..4).map(|_| pool.try_acquire().unwrap()).collect();
    assert_eq!(pool.in_use(), 4096);
    assert_eq!(pool.allocated(), 4096);
    assert!(chunks.iter().all(|c| c.len() == 1024));

    // Fifth non-blocking acquire finds the pool exhausted
    assert!(pool.acquire(false).is_none());
    assert_eq!(pool.allocated(), 4096);

    // A released chunk is handed out again without a new allocation
    let mut chunks = chunks;
    chunks.pop();
    assert_eq!(pool.in_use(), 3072);
    assert_eq!(pool.idle_chunks(), 1);

    let again = pool.try_acquire().unwrap();
    assert_eq!(again.len(), 1024);
    assert_eq!(pool.allocated(), 4096);
    assert_eq!(pool.in_use(), 4096);
    assert_eq!(pool.idle_chunks(), 0);
}

#[test]
fn test_release_on_drop() {
    let pool = MemoryPool::new(512, 2048);

    {
        let _a = pool.try_acquire().unwrap();
        let _b = pool.try_acquire().unwrap();
        assert_eq!(pool.in_use(), 1024);
    }

    assert_eq!(pool.in_use(), 0);
    assert_eq!(pool.allocated(), 1024);
    assert_eq!(pool.idle_chunks(), 2);
    assert_eq!(pool.max_in_use(), 1024);
}

#[test]
fn test_chunk_is_writable() {
    let pool = MemoryPool::new(64, 64);
    let mut chunk = pool.acquire_blocking();

    chunk[..4].copy_from_slice(b"FACT");
    chunk[63] = 0xFF;
    assert_eq!(&chunk[..4], b"FACT");
    assert_eq!(chunk[63], 0xFF);
    assert_eq!(chunk.len(), 64);
}

#[test]
fn test_max_memory_clamped_to_chunk() {
    let pool = MemoryPool::new(4096, 100);
    assert_eq!(pool.max_memory(), 4096);
    assert!(pool.try_acquire().is_some());
}

#[test]
fn test_ceiling_not_multiple_of_chunk() {
    let pool = MemoryPool::new(1000, 2500);
    let _a = pool.try_acquire().unwrap();
    let _b = pool.try_acquire().unwrap();
    assert!(pool.try_acquire().is_none());
    assert_eq!(pool.allocated(), 2000);
}

#[test]
fn test_shared_chunk_returns_on_last_drop() {
    let pool = MemoryPool::new(128, 128);
    let shared = std::sync::Arc::new(pool.try_acquire().unwrap());
    let other = std::sync::Arc::clone(&shared);

    drop(shared);
    assert_eq!(pool.in_use(), 128);

    drop(other);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_from_config() {
    let config = Config::builder()
        .pool_chunk_size(2048)
        .pool_max_memory(8192)
        .build();
    let pool = MemoryPool::from_config(&config).unwrap();
    assert_eq!(pool.chunk_size(), 2048);
    assert_eq!(pool.max_memory(), 8192);

    let bad = Config::builder().pool_chunk_size(0).build();
    assert!(matches!(MemoryPool::from_config(&bad), Err(StoreError::Config(_))));
}

// =============================================================================
// Chunk Size
// =============================================================================

#[test]
fn test_set_chunk_size_while_in_use_fails() {
    let pool = MemoryPool::new(1024, 4096);
    let chunk = pool.try_acquire().unwrap();

    assert!(matches!(
        pool.set_chunk_size(2048),
        Err(StoreError::PoolBusy { in_use: 1024 })
    ));
    assert_eq!(pool.chunk_size(), 1024);

    drop(chunk);
    pool.set_chunk_size(2048).unwrap();
    assert_eq!(pool.chunk_size(), 2048);
}

#[test]
fn test_set_chunk_size_above_ceiling_fails() {
    let pool = MemoryPool::new(1024, 4096);
    assert!(matches!(
        pool.set_chunk_size(8192),
        Err(StoreError::ChunkTooLarge { size: 8192, max: 4096 })
    ));
    assert_eq!(pool.chunk_size(), 1024);
}

#[test]
fn test_set_chunk_size_zero_fails() {
    let pool = MemoryPool::new(1024, 4096);
    drop(pool.try_acquire().unwrap());

    assert!(matches!(pool.set_chunk_size(0), Err(StoreError::EmptyChunk)));
    assert_eq!(pool.chunk_size(), 1024);
    assert_eq!(pool.idle_chunks(), 1);
}

#[test]
fn test_new_chunk_size_applies_to_next_acquire() {
    let pool = MemoryPool::new(1024, 4096);
    drop(pool.try_acquire().unwrap());
    assert_eq!(pool.idle_chunks(), 1);

    pool.set_chunk_size(2048).unwrap();
    assert_eq!(pool.idle_chunks(), 0);
    assert_eq!(pool.allocated(), 0);

    let a = pool.try_acquire().unwrap();
    let b = pool.try_acquire().unwrap();
    assert_eq!(a.len(), 2048);
    assert_eq!(b.len(), 2048);
    assert!(pool.try_acquire().is_none());
}

// =============================================================================
// Memory Ceiling
// =============================================================================

#[test]
fn test_lowering_ceiling_frees_idle_chunks() {
    let pool = MemoryPool::new(1024, 4096);
    let chunks: Vec<_> = (0..4).map(|_| pool.try_acquire().unwrap()).collect();
    drop(chunks);
    assert_eq!(pool.allocated(), 4096);

    pool.set_max_memory(2048).unwrap();
    assert_eq!(pool.allocated(), 2048);
    assert_eq!(pool.idle_chunks(), 2);
}

#[test]
fn test_lowering_ceiling_converges_as_chunks_return() {
    let pool = MemoryPool::new(1024, 4096);
    let mut chunks: Vec<_> = (0..4).map(|_| pool.try_acquire().unwrap()).collect();

    pool.set_max_memory(2048).unwrap();
    assert_eq!(pool.allocated(), 4096);

    chunks.pop();
    assert_eq!(pool.allocated(), 3072);
    chunks.pop();
    assert_eq!(pool.allocated(), 2048);
    chunks.pop();
    assert_eq!(pool.allocated(), 2048);
    assert_eq!(pool.idle_chunks(), 1);
}

#[test]
fn test_ceiling_below_chunk_rejected() {
    let pool = MemoryPool::new(1024, 4096);
    assert!(matches!(
        pool.set_max_memory(512),
        Err(StoreError::MemoryLimitTooSmall { max: 512, chunk: 1024 })
    ));
    assert_eq!(pool.max_memory(), 4096);
}

#[test]
fn test_stats_snapshot() {
    let pool = MemoryPool::new(256, 1024);
    let _chunk = pool.try_acquire().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.chunk_size, 256);
    assert_eq!(stats.max_memory, 1024);
    assert_eq!(stats.allocated, 256);
    assert_eq!(stats.in_use, 256);
    assert_eq!(stats.idle_chunks, 0);
}
