//! FITS Tile Codec Module
//!
//! Metadata codec for tiled, compressed columnar data.
//!
//! ## Responsibilities
//! - Encode/decode the compression descriptor preceding each data block
//! - Encode/decode the `TILE` marker header preceding each row group
//! - Reserved keyword check and column type lookups for table writers
//! - Walk tiles and blocks over any seekable byte source
//!
//! ## On-Disk Layout (native byte order)
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Tile Header (16 bytes)                                   │
//! │   Tag: "TILE" (4) | NumRows: u32 (4) | Size: u64 (8)     │
//! ├──────────────────────────────────────────────────────────┤
//! │ Block 1                                                  │
//! │ ┌──────────┬───────────┬────────────┬────────────┬─────┐ │
//! │ │ Size (8) │ Order (1) │ NumProcs(1)│ Procs (2n) │Data │ │
//! │ └──────────┴───────────┴────────────┴────────────┴─────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Block 2 ... one block per column                         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The tile `Size` counts the bytes following the tile header. A block `Size`
//! counts the whole block, descriptor included.

mod descriptor;
mod keywords;
mod tile;
mod walker;

pub use descriptor::{CompressionDescriptor, CompressionProcess, RowOrdering, BLOCK_HEADER_SIZE};
pub use keywords::{comment_from_type, is_reserved_keyword, size_from_type};
pub use tile::{TileHeader, TILE_HEADER_SIZE, TILE_TAG};
pub use walker::{CompressedBlock, Tile, TileWalker};

pub(crate) use walker::read_exact_or_eof;
