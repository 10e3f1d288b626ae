//! Error types for evtstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for evtstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors (tag / magic / block order mismatch on read)
    // -------------------------------------------------------------------------
    #[error("Framing corruption: {0}")]
    Framing(String),

    #[error("Invalid compression descriptor: {0}")]
    InvalidDescriptor(String),

    // -------------------------------------------------------------------------
    // Memory Pool Errors
    // -------------------------------------------------------------------------
    #[error("Cannot change the chunk size while {in_use} bytes are in use")]
    PoolBusy { in_use: usize },

    #[error("Chunk size ({size}) larger than allowed memory ({max})")]
    ChunkTooLarge { size: usize, max: usize },

    #[error("Memory limit ({max}) smaller than chunk size ({chunk})")]
    MemoryLimitTooSmall { max: usize, chunk: usize },

    #[error("Chunk size must be positive")]
    EmptyChunk,

    // -------------------------------------------------------------------------
    // Decompression Stream Errors
    // -------------------------------------------------------------------------
    #[error("Stream failed: {0}")]
    StreamFailed(String),

    #[error("Seeking relative to the end of a compressed stream is not supported")]
    UnsupportedSeek,

    #[error("Seek failed: {0}")]
    Seek(String),

    // -------------------------------------------------------------------------
    // Raw Writer Errors
    // -------------------------------------------------------------------------
    #[error("File '{}' already exists", .0.display())]
    FileExists(PathBuf),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Close failed: {0}")]
    CloseFailed(String),

    #[error("Invalid writer state: {0}")]
    WriterState(String),

    #[error("Invalid event record: {0}")]
    InvalidEvent(String),

    #[error("No free run number left (1..=999 exhausted)")]
    RunNumbersExhausted,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for std::io::Error {
    fn from(err: StoreError) -> Self {
        use std::io::ErrorKind;

        let kind = match err {
            StoreError::Io(e) => return e,
            StoreError::Framing(_) | StoreError::InvalidDescriptor(_) => ErrorKind::InvalidData,
            StoreError::UnsupportedSeek => ErrorKind::Unsupported,
            StoreError::Seek(_) => ErrorKind::InvalidInput,
            StoreError::FileExists(_) => ErrorKind::AlreadyExists,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
