//! Memory Chunk
//!
//! RAII handle on one pool buffer.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::stock::MemoryStock;

/// A fixed-size buffer on loan from a [`MemoryPool`](super::MemoryPool)
///
/// The chunk has exactly one owner. Dropping it hands the buffer back to the
/// pool it came from, waking one blocked acquirer. To share a chunk between
/// several readers wrap it in an `Arc`; the buffer returns when the last
/// clone is dropped.
pub struct MemoryChunk {
    data: Box<[u8]>,
    stock: Arc<MemoryStock>,
}

impl MemoryChunk {
    pub(super) fn new(data: Box<[u8]>, stock: Arc<MemoryStock>) -> Self {
        Self { data, stock }
    }

    /// Size of the buffer (the pool's chunk size when it was acquired)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Deref for MemoryChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for MemoryChunk {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl AsRef<[u8]> for MemoryChunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for MemoryChunk {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for MemoryChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChunk")
            .field("len", &self.data.len())
            .finish()
    }
}

impl Drop for MemoryChunk {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.stock.push(data);
    }
}
