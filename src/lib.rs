//! # evtstore
//!
//! Storage and codec layer for high-rate detector event data:
//! - Block-framed raw run files, written sequentially and scanned back
//! - Compression descriptors and tile headers of compressed column files
//! - A bounded, thread-safe pool of fixed-size event buffers
//! - A seekable reader over gzip-compressed archives
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Producers (capture threads)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ acquire / encode
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Memory Pool                             │
//! │            (bounded, blocking or non-blocking)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ MemoryChunk
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Event Pipeline                            │
//! │           (bounded channel → one writer thread)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐           ┌───────────────┐
//!               │   RawWriter   │──file────►│   RawReader   │
//!               │ (framed run)  │  .bin(.gz)│  over ZStream │
//!               └───────────────┘           └───────────────┘
//!
//!   Compressed column files: TileHeader + CompressionDescriptor blocks,
//!   walked by TileWalker over any Read + Seek source (ZStream included)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod fits;
pub mod pool;
pub mod stream;
pub mod raw;
pub mod pipeline;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::Config;
pub use fits::{CompressionDescriptor, CompressionProcess, RowOrdering, TileHeader, TileWalker};
pub use pool::{MemoryChunk, MemoryPool, PoolStats};
pub use stream::{Origin, ZStream};
pub use raw::{Event, RawReader, RawWriter, RunDescription, RunHeader};
pub use pipeline::{EventPipeline, PipelineStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of evtstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
