//! Tile Header
//!
//! Marker header starting each row group of a compressed table.

use bytes::{Buf, BufMut};

use crate::error::{Result, StoreError};

/// Literal tag opening every tile
pub const TILE_TAG: &[u8; 4] = b"TILE";

/// Header size: Tag (4) + NumRows (4) + Size (8) = 16 bytes
pub const TILE_HEADER_SIZE: usize = 16;

/// Header of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileHeader {
    /// Rows stored in this tile
    pub num_rows: u32,
    /// Payload bytes following the header
    pub size: u64,
}

impl TileHeader {
    pub fn new(num_rows: u32, size: u64) -> Self {
        Self { num_rows, size }
    }

    /// Write the header into `dest`
    ///
    /// # Panics
    ///
    /// Panics if `dest` is shorter than `TILE_HEADER_SIZE`.
    pub fn encode_into(&self, dest: &mut [u8]) {
        assert!(
            dest.len() >= TILE_HEADER_SIZE,
            "tile header needs {} bytes, buffer has {}",
            TILE_HEADER_SIZE,
            dest.len()
        );

        let mut buf = dest;
        buf.put_slice(TILE_TAG);
        buf.put_u32_ne(self.num_rows);
        buf.put_u64_ne(self.size);
    }

    pub fn to_bytes(&self) -> [u8; TILE_HEADER_SIZE] {
        let mut bytes = [0u8; TILE_HEADER_SIZE];
        self.encode_into(&mut bytes);
        bytes
    }

    /// Decode and validate a tile header
    ///
    /// A tag other than `TILE` is framing corruption; there is no attempt to
    /// re-synchronise on the next marker.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TILE_HEADER_SIZE {
            return Err(StoreError::Framing(format!(
                "incomplete tile header: expected {} bytes, got {}",
                TILE_HEADER_SIZE,
                bytes.len()
            )));
        }

        if &bytes[0..4] != TILE_TAG {
            return Err(StoreError::Framing(format!(
                "invalid tile tag: expected TILE, got {:?}",
                &bytes[0..4]
            )));
        }

        let mut buf = &bytes[4..TILE_HEADER_SIZE];
        let num_rows = buf.get_u32_ne();
        let size = buf.get_u64_ne();

        Ok(Self { num_rows, size })
    }
}
