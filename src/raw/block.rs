//! Block framing shared by the raw writer and reader.

use bytes::{Buf, BufMut};

use crate::error::{Result, StoreError};

/// Magic word opening every raw file
pub const MAGIC: u32 = 0xFAC7_7E1E;

/// Block header size: Type (4) + Version (4) + Id (4) + Length (4) = 16 bytes
pub const BLOCK_HEADER_SIZE: usize = 16;

/// Version written into every non-terminal block
pub const FORMAT_VERSION: u32 = 1;

/// Number of board slots; a board header block is written for each
pub const NUM_BOARDS: usize = 40;

/// Largest payload a reader accepts (64 MB)
pub const MAX_BLOCK_PAYLOAD: u32 = 64 * 1024 * 1024;

/// Known block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BlockType {
    EndOfFile = 0,
    Identifier = 1,
    RunHeader = 2,
    BoardHeader = 3,
    RunSummary = 4,
    Event = 10,
}

impl BlockType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::EndOfFile),
            1 => Some(Self::Identifier),
            2 => Some(Self::RunHeader),
            3 => Some(Self::BoardHeader),
            4 => Some(Self::RunSummary),
            10 => Some(Self::Event),
            _ => None,
        }
    }
}

/// Header framing one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Raw type code; may be a type this version does not know
    pub block_type: u32,
    pub version: u32,
    /// Sequence number (events, boards) or 0
    pub id: u32,
    /// Payload bytes following the header
    pub length: u32,
}

impl BlockHeader {
    pub fn new(block_type: BlockType, version: u32, id: u32, length: u32) -> Self {
        Self {
            block_type: block_type as u32,
            version,
            id,
            length,
        }
    }

    /// The terminal block: every field zero
    pub fn end_of_file() -> Self {
        Self::new(BlockType::EndOfFile, 0, 0, 0)
    }

    /// Known type of this block, `None` for future types
    pub fn kind(&self) -> Option<BlockType> {
        BlockType::from_u32(self.block_type)
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut bytes = [0u8; BLOCK_HEADER_SIZE];
        let mut buf = &mut bytes[..];
        buf.put_u32_ne(self.block_type);
        buf.put_u32_ne(self.version);
        buf.put_u32_ne(self.id);
        buf.put_u32_ne(self.length);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(StoreError::Framing(format!(
                "incomplete block header: expected {} bytes, got {}",
                BLOCK_HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut buf = &bytes[..BLOCK_HEADER_SIZE];
        Ok(Self {
            block_type: buf.get_u32_ne(),
            version: buf.get_u32_ne(),
            id: buf.get_u32_ne(),
            length: buf.get_u32_ne(),
        })
    }
}
