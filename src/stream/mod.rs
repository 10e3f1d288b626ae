//! Seekable Decompression Stream Module
//!
//! Random-access reading of gzip-compressed (or plain) files.
//!
//! ## Responsibilities
//! - Decompress lazily into a large read-ahead buffer
//! - Keep a few already-consumed bytes as a putback region
//! - Serve relative seeks inside the buffered window without touching the
//!   decompressor
//! - Report failures through a status flag as well as through `Result`
//!
//! ## Buffer Layout
//! ```text
//!  0      PUTBACK_SIZE                                   capacity
//!  ┌──────┬───────────────────────────────────────────────┐
//!  │ putb │ decompressed data                             │
//!  └──────┴───────────────────────────────────────────────┘
//!     ▲          ▲                         ▲
//!   begin       pos                       end
//! ```
//! `[begin, end)` is the window a seek can land in without a refill; bytes in
//! `[begin, PUTBACK_SIZE)` are the last bytes consumed before the refill.

mod engine;
mod zstream;

pub use zstream::ZStream;

/// Bytes of already-consumed data preserved across a refill
pub const PUTBACK_SIZE: usize = 4;

/// Default read-ahead buffer size (4 MB)
pub const DEFAULT_BUFFER_SIZE: usize = 2048 * 1024 * 2;

/// Reference point of a relative seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// From the start of the decompressed data
    Beginning,
    /// From the current read position
    Current,
    /// From the end; not supported on compressed streams
    End,
}
