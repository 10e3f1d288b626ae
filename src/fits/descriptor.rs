//! Compression Descriptor
//!
//! The fixed header written in front of every compressed data block.

use bytes::{Buf, BufMut};

use crate::error::{Result, StoreError};

/// Fixed part of the block header: Size (8) + Ordering (1) + NumProcs (1)
pub const BLOCK_HEADER_SIZE: usize = 10;

/// Identifier of a compression process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CompressionProcess {
    /// Bytes stored as they are
    Raw = 0x0,
    /// Smoothing filter on 16-bit samples
    Smoothing = 0x1,
    /// 16-bit Huffman coding
    Huffman16 = 0x2,
}

impl CompressionProcess {
    /// On-disk identifier
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Map an on-disk identifier back to a process
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0x0 => Some(Self::Raw),
            0x1 => Some(Self::Smoothing),
            0x2 => Some(Self::Huffman16),
            _ => None,
        }
    }
}

/// Byte layout of the rows inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RowOrdering {
    /// Column-major: all rows of one element, then the next element
    #[default]
    ByColumn = b'C',
    /// Row-major
    ByRow = b'R',
}

impl RowOrdering {
    /// On-disk byte ('C' or 'R')
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Map an on-disk byte back to an ordering
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'C' => Some(Self::ByColumn),
            b'R' => Some(Self::ByRow),
            _ => None,
        }
    }
}

/// Compression plan and header of one data block
///
/// ## Encoded form
/// `{size: u64, ordering: u8, num_procs: u8}` followed by `num_procs` × `u16`
/// process identifiers, all in native byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionDescriptor {
    processes: Vec<CompressionProcess>,
    ordering: RowOrdering,
    /// Total block size on disk, header included (0 until known)
    block_size: u64,
}

impl CompressionDescriptor {
    /// Build a descriptor from a full process sequence
    ///
    /// The sequence is applied left to right when writing and undone right to
    /// left when reading. It must hold between 1 and 255 processes.
    pub fn new(processes: Vec<CompressionProcess>, ordering: RowOrdering) -> Result<Self> {
        if processes.is_empty() {
            return Err(StoreError::InvalidDescriptor(
                "process sequence must not be empty".to_string(),
            ));
        }
        if processes.len() > u8::MAX as usize {
            return Err(StoreError::InvalidDescriptor(format!(
                "too many processes: {} (max {})",
                processes.len(),
                u8::MAX
            )));
        }

        Ok(Self {
            processes,
            ordering,
            block_size: 0,
        })
    }

    /// Build a descriptor with a single process
    pub fn single(process: CompressionProcess, ordering: RowOrdering) -> Self {
        Self {
            processes: vec![process],
            ordering,
            block_size: 0,
        }
    }

    /// Number of bytes `encode_into` writes
    pub fn size_on_disk(&self) -> usize {
        BLOCK_HEADER_SIZE + 2 * self.processes.len()
    }

    pub fn ordering(&self) -> RowOrdering {
        self.ordering
    }

    pub fn num_processes(&self) -> usize {
        self.processes.len()
    }

    /// The i-th process of the sequence
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.num_processes()`.
    pub fn process(&self, i: usize) -> CompressionProcess {
        self.processes[i]
    }

    pub fn processes(&self) -> &[CompressionProcess] {
        &self.processes
    }

    /// Processes in the order they have to be undone when reading
    pub fn unapply_order(&self) -> impl Iterator<Item = CompressionProcess> + '_ {
        self.processes.iter().rev().copied()
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Record the total block size once the payload is known
    pub fn set_block_size(&mut self, size: u64) {
        self.block_size = size;
    }

    /// Bytes of payload following the descriptor, derived from the block size
    pub fn payload_size(&self) -> Result<u64> {
        self.block_size
            .checked_sub(self.size_on_disk() as u64)
            .ok_or_else(|| {
                StoreError::Framing(format!(
                    "block size {} smaller than its own header ({} bytes)",
                    self.block_size,
                    self.size_on_disk()
                ))
            })
    }

    /// Copy the header and process list into `dest`
    ///
    /// # Panics
    ///
    /// Panics if `dest` is shorter than `self.size_on_disk()`.
    pub fn encode_into(&self, dest: &mut [u8]) {
        assert!(
            dest.len() >= self.size_on_disk(),
            "descriptor needs {} bytes, buffer has {}",
            self.size_on_disk(),
            dest.len()
        );

        let mut buf = dest;
        buf.put_u64_ne(self.block_size);
        buf.put_u8(self.ordering.as_byte());
        buf.put_u8(self.processes.len() as u8);
        for process in &self.processes {
            buf.put_u16_ne(process.id());
        }
    }

    /// Encode into a freshly allocated buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size_on_disk()];
        self.encode_into(&mut bytes);
        bytes
    }

    /// Number of process ids announced by an encoded fixed header
    ///
    /// Lets sequential readers learn the full descriptor size after reading
    /// only `BLOCK_HEADER_SIZE` bytes.
    pub fn announced_size(fixed: &[u8]) -> Result<usize> {
        if fixed.len() < BLOCK_HEADER_SIZE {
            return Err(StoreError::Framing(format!(
                "incomplete block header: expected {} bytes, got {}",
                BLOCK_HEADER_SIZE,
                fixed.len()
            )));
        }
        Ok(BLOCK_HEADER_SIZE + 2 * fixed[BLOCK_HEADER_SIZE - 1] as usize)
    }

    /// Decode a descriptor from its encoded form
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let total = Self::announced_size(bytes)?;
        if bytes.len() < total {
            return Err(StoreError::Framing(format!(
                "incomplete process list: expected {} bytes, got {}",
                total,
                bytes.len()
            )));
        }

        let mut buf = &bytes[..total];
        let block_size = buf.get_u64_ne();
        let ordering_byte = buf.get_u8();
        let num_procs = buf.get_u8() as usize;

        let ordering = RowOrdering::from_byte(ordering_byte).ok_or_else(|| {
            StoreError::Framing(format!("unknown row ordering: 0x{:02x}", ordering_byte))
        })?;

        if num_procs == 0 {
            return Err(StoreError::Framing(
                "block header announces no compression process".to_string(),
            ));
        }

        let mut processes = Vec::with_capacity(num_procs);
        for _ in 0..num_procs {
            let id = buf.get_u16_ne();
            let process = CompressionProcess::from_id(id).ok_or_else(|| {
                StoreError::Framing(format!("unknown compression process: {}", id))
            })?;
            processes.push(process);
        }

        Ok(Self {
            processes,
            ordering,
            block_size,
        })
    }
}

impl Default for CompressionDescriptor {
    fn default() -> Self {
        Self::single(CompressionProcess::Raw, RowOrdering::ByColumn)
    }
}
