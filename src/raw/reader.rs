//! Raw Reader
//!
//! Walks the blocks of a raw file and checks that they come in the order the
//! writer produces them.

use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::fits::read_exact_or_eof;
use crate::stream::ZStream;

use super::block::{BlockHeader, BlockType, BLOCK_HEADER_SIZE, MAGIC, MAX_BLOCK_PAYLOAD, NUM_BOARDS};
use super::headers::{BoardHeader, Event, Identifier, RunHeader};

/// One block as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Vec<u8>,
}

impl Block {
    pub fn kind(&self) -> Option<BlockType> {
        self.header.kind()
    }

    /// Decode the payload of an event block
    pub fn to_event(&self) -> Result<Event> {
        match self.kind() {
            Some(BlockType::Event) => Event::decode_payload(&self.payload),
            _ => Err(StoreError::Framing(format!(
                "block type {} is not an event",
                self.header.block_type
            ))),
        }
    }
}

/// Next block the reader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Identifier,
    RunHeader,
    Board(u32),
    RunSummary,
    /// Event with the given id, or the end-of-file block
    Event(u32),
    /// End-of-file seen; only trailing-data check left
    Trailer,
    Finished,
}

/// Sequential reader of a raw file
pub struct RawReader<R: Read> {
    reader: R,
    expect: Expect,
    blocks_read: u64,
    skipped: u64,
}

impl RawReader<ZStream> {
    /// Open a raw file, plain or gzip-compressed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let stream = ZStream::try_open(path)?;
        Self::new(stream)
    }
}

impl<R: Read> RawReader<R> {
    /// Wrap a reader positioned at the start of a raw file
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => StoreError::Framing("file too short for magic".to_string()),
            _ => StoreError::Io(e),
        })?;

        let found = u32::from_ne_bytes(magic);
        if found != MAGIC {
            return Err(StoreError::Framing(format!(
                "bad magic: expected {:#010x}, found {:#010x}",
                MAGIC, found
            )));
        }

        Ok(Self {
            reader,
            expect: Expect::Identifier,
            blocks_read: 0,
            skipped: 0,
        })
    }

    /// Read the next block
    ///
    /// Returns `Ok(None)` once the end-of-file block has been read and
    /// nothing follows it.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        match self.next_block_inner() {
            Ok(block) => Ok(block),
            Err(e) => {
                self.expect = Expect::Finished;
                Err(e)
            }
        }
    }

    fn next_block_inner(&mut self) -> Result<Option<Block>> {
        loop {
            match self.expect {
                Expect::Finished => return Ok(None),
                Expect::Trailer => {
                    let mut probe = [0u8; 1];
                    if read_exact_or_eof(&mut self.reader, &mut probe)? {
                        return Err(StoreError::Framing(
                            "data after end-of-file block".to_string(),
                        ));
                    }
                    self.expect = Expect::Finished;
                    return Ok(None);
                }
                _ => {}
            }

            let mut raw = [0u8; BLOCK_HEADER_SIZE];
            if !read_exact_or_eof(&mut self.reader, &mut raw)? {
                return Err(StoreError::Framing(format!(
                    "missing end-of-file block after {} blocks",
                    self.blocks_read
                )));
            }
            let header = BlockHeader::decode(&raw)?;

            if header.length > MAX_BLOCK_PAYLOAD {
                return Err(StoreError::Framing(format!(
                    "block payload of {} bytes exceeds limit of {}",
                    header.length, MAX_BLOCK_PAYLOAD
                )));
            }

            let mut payload = vec![0u8; header.length as usize];
            self.reader.read_exact(&mut payload).map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => StoreError::Framing(format!(
                    "truncated payload of block type {}",
                    header.block_type
                )),
                _ => StoreError::Io(e),
            })?;
            self.blocks_read += 1;

            let kind = match header.kind() {
                Some(kind) => kind,
                None if matches!(self.expect, Expect::RunSummary | Expect::Event(_)) => {
                    warn!(
                        block_type = header.block_type,
                        bytes = header.length,
                        "Skipping unknown block"
                    );
                    self.skipped += 1;
                    continue;
                }
                None => {
                    return Err(StoreError::Framing(format!(
                        "unknown block type {} before the board headers",
                        header.block_type
                    )))
                }
            };

            self.expect = self.advance(kind, &header)?;
            debug!(?kind, id = header.id, bytes = header.length, "Read block");

            return Ok(Some(Block { header, payload }));
        }
    }

    /// Check `kind` against the expected order and return the next state
    fn advance(&self, kind: BlockType, header: &BlockHeader) -> Result<Expect> {
        let out_of_order = || {
            StoreError::Framing(format!(
                "unexpected block {:?} (id {}) while expecting {:?}",
                kind, header.id, self.expect
            ))
        };

        let next = match (self.expect, kind) {
            (Expect::Identifier, BlockType::Identifier) => Expect::RunHeader,
            (Expect::RunHeader, BlockType::RunHeader) => Expect::Board(0),
            (Expect::Board(n), BlockType::BoardHeader) if header.id == n => {
                if n as usize + 1 == NUM_BOARDS {
                    Expect::RunSummary
                } else {
                    Expect::Board(n + 1)
                }
            }
            (Expect::RunSummary, BlockType::RunSummary) => Expect::Event(0),
            (Expect::Event(n), BlockType::Event) if header.id == n => Expect::Event(n + 1),
            (Expect::Event(_), BlockType::EndOfFile) => {
                if header.length != 0 {
                    return Err(StoreError::Framing(format!(
                        "end-of-file block with {} payload bytes",
                        header.length
                    )));
                }
                Expect::Trailer
            }
            _ => return Err(out_of_order()),
        };

        Ok(next)
    }

    /// Blocks read so far, skipped ones included
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Blocks of unknown type that were skipped
    pub fn skipped_blocks(&self) -> u64 {
        self.skipped
    }

    /// Whether the end-of-file block has been reached
    pub fn is_finished(&self) -> bool {
        matches!(self.expect, Expect::Trailer | Expect::Finished)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for RawReader<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

impl<R: Read> std::fmt::Debug for RawReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawReader")
            .field("expect", &self.expect)
            .field("blocks_read", &self.blocks_read)
            .finish()
    }
}

// =============================================================================
// Scan
// =============================================================================

/// What a full pass over a raw file found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub identifier: Identifier,
    /// Run header with its board headers filled in
    pub run: RunHeader,
    pub blocks: u64,
    pub events: u32,
    /// Event payload bytes
    pub event_bytes: u64,
    pub skipped_blocks: u64,
}

impl ScanSummary {
    pub fn boards_present(&self) -> usize {
        self.run.boards_present()
    }
}

/// Read a whole raw file (plain or gzip), validating its structure
pub fn scan(path: impl AsRef<Path>) -> Result<ScanSummary> {
    let mut reader = RawReader::open(path)?;

    let mut identifier = Identifier::default();
    let mut run = RunHeader::default();
    let mut events = 0u32;
    let mut event_bytes = 0u64;

    while let Some(block) = reader.next_block()? {
        match block.kind() {
            Some(BlockType::Identifier) => identifier = Identifier::decode(&block.payload)?,
            Some(BlockType::RunHeader) => run = RunHeader::decode(&block.payload)?,
            Some(BlockType::BoardHeader) => {
                run.boards[block.header.id as usize] = BoardHeader::decode(&block.payload)?;
            }
            Some(BlockType::Event) => {
                events += 1;
                event_bytes += block.payload.len() as u64;
            }
            _ => {}
        }
    }

    Ok(ScanSummary {
        identifier,
        run,
        blocks: reader.blocks_read(),
        events,
        event_bytes,
        skipped_blocks: reader.skipped_blocks(),
    })
}
