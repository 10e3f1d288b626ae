//! Tile Walker
//!
//! Sequential and skipping iteration over tiles of compressed blocks.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::{Result, StoreError};

use super::{CompressionDescriptor, TileHeader, BLOCK_HEADER_SIZE, TILE_HEADER_SIZE};

/// One compressed block: its descriptor and the (still transformed) payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    pub descriptor: CompressionDescriptor,
    pub payload: Vec<u8>,
}

impl CompressedBlock {
    /// Pair a descriptor with its payload, fixing up the block size
    pub fn new(mut descriptor: CompressionDescriptor, payload: Vec<u8>) -> Self {
        descriptor.set_block_size((descriptor.size_on_disk() + payload.len()) as u64);
        Self { descriptor, payload }
    }

    /// Bytes this block occupies on disk
    pub fn size_on_disk(&self) -> u64 {
        self.descriptor.block_size()
    }
}

/// A decoded tile: header plus one block per column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub header: TileHeader,
    pub blocks: Vec<CompressedBlock>,
}

impl Tile {
    /// Build a tile from its blocks; the header size is derived from them
    pub fn new(num_rows: u32, blocks: Vec<CompressedBlock>) -> Self {
        let size = blocks.iter().map(|b| b.size_on_disk()).sum();
        Self {
            header: TileHeader::new(num_rows, size),
            blocks,
        }
    }

    /// Encode header and blocks back-to-back
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(TILE_HEADER_SIZE + self.header.size as usize);
        bytes.extend_from_slice(&self.header.to_bytes());
        for block in &self.blocks {
            bytes.extend_from_slice(&block.descriptor.to_bytes());
            bytes.extend_from_slice(&block.payload);
        }
        bytes
    }
}

/// Walks the tiles of a compressed table body
///
/// Works over any seekable source; over a `ZStream`, `skip_tile` turns into a
/// relative seek that stays inside the read-ahead buffer when possible.
pub struct TileWalker<R> {
    reader: R,
    tiles_read: u64,
}

impl<R: Read + Seek> TileWalker<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tiles_read: 0,
        }
    }

    /// Number of tiles returned or skipped so far
    pub fn tiles_read(&self) -> u64 {
        self.tiles_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next tile with all its blocks
    ///
    /// Returns `Ok(None)` on a clean end of input before a tile header.
    pub fn next_tile(&mut self) -> Result<Option<Tile>> {
        let header = match self.read_tile_header()? {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut blocks = Vec::new();
        let mut consumed: u64 = 0;

        while consumed < header.size {
            let block = self.read_block()?;
            consumed += block.size_on_disk();
            if consumed > header.size {
                return Err(StoreError::Framing(format!(
                    "blocks overrun tile {}: {} bytes declared, {} read",
                    self.tiles_read, header.size, consumed
                )));
            }
            blocks.push(block);
        }

        debug!(
            tile = self.tiles_read,
            rows = header.num_rows,
            blocks = blocks.len(),
            "Read tile"
        );
        self.tiles_read += 1;

        Ok(Some(Tile { header, blocks }))
    }

    /// Read only the next tile header and seek past its payload
    pub fn skip_tile(&mut self) -> Result<Option<TileHeader>> {
        let header = match self.read_tile_header()? {
            Some(h) => h,
            None => return Ok(None),
        };

        let offset = i64::try_from(header.size).map_err(|_| {
            StoreError::Framing(format!("tile size {} out of range", header.size))
        })?;
        self.reader.seek(SeekFrom::Current(offset))?;
        self.tiles_read += 1;

        Ok(Some(header))
    }

    fn read_tile_header(&mut self) -> Result<Option<TileHeader>> {
        let mut bytes = [0u8; TILE_HEADER_SIZE];
        if !read_exact_or_eof(&mut self.reader, &mut bytes)? {
            return Ok(None);
        }
        TileHeader::decode(&bytes).map(Some)
    }

    fn read_block(&mut self) -> Result<CompressedBlock> {
        let mut fixed = [0u8; BLOCK_HEADER_SIZE];
        self.reader.read_exact(&mut fixed).map_err(truncated)?;

        let total = CompressionDescriptor::announced_size(&fixed)?;
        let mut header = vec![0u8; total];
        header[..BLOCK_HEADER_SIZE].copy_from_slice(&fixed);
        self.reader
            .read_exact(&mut header[BLOCK_HEADER_SIZE..])
            .map_err(truncated)?;

        let descriptor = CompressionDescriptor::decode(&header)?;
        let payload_len = descriptor.payload_size()?;

        let mut payload = vec![0u8; payload_len as usize];
        self.reader.read_exact(&mut payload).map_err(truncated)?;

        Ok(CompressedBlock { descriptor, payload })
    }
}

/// Fill `buf` completely, or report a clean EOF if nothing was read
pub(crate) fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(StoreError::Framing(format!(
                    "truncated header: {} of {} bytes",
                    filled,
                    buf.len()
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

fn truncated(e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::UnexpectedEof {
        StoreError::Framing("truncated block".to_string())
    } else {
        StoreError::Io(e)
    }
}
