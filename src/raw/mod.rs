//! Raw Event File Module
//!
//! Self-framed, append-only binary files holding one run.
//!
//! ## Responsibilities
//! - Write the run identity, run header and the 40 board headers
//! - Append event records with monotonically increasing ids
//! - Terminate every file with an end-of-file block
//! - Scan files back, validating the block order
//!
//! ## File Format (native byte order)
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Magic: 0xFAC77E1E (4)                                │
//! ├──────────────────────────────────────────────────────┤
//! │ Block: Type (4) | Version (4) | Id (4) | Length (4)  │
//! │        Payload (Length bytes)                        │
//! ├──────────────────────────────────────────────────────┤
//! │ Identifier   type=1  id=0      device id, run id     │
//! │ RunHeader    type=2  id=0      run metadata          │
//! │ BoardHeader  type=3  id=0..39  one per board slot    │
//! │ RunSummary   type=4  id=0      4-byte placeholder    │
//! │ Event        type=10 id=0..K-1 header + samples      │
//! │ EndOfFile    type=0  ver=0     length=0              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Integers are written in host byte order; files are not portable between
//! hosts of different endianness.

mod block;
mod headers;
pub mod naming;
mod reader;
mod writer;

pub use block::{BlockHeader, BlockType, BLOCK_HEADER_SIZE, FORMAT_VERSION, MAGIC, MAX_BLOCK_PAYLOAD, NUM_BOARDS};
pub use headers::{
    BoardHeader, Event, Identifier, RunDescription, RunHeader, BOARD_HEADER_SIZE,
    BOARD_START_MARKER, EVENT_ALIGNMENT_SIZE, EVENT_RECORD_SIZE, IDENTIFIER_SIZE,
    RUN_HEADER_SIZE, RUN_SUMMARY_SIZE,
};
pub use reader::{scan, Block, RawReader, ScanSummary};
pub use writer::{RawWriter, WriterState};
