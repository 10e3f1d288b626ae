//! Tests for tile headers and the tile walker
//!
//! These tests verify:
//! - Tile header layout and tag validation
//! - Walking tiles over in-memory and gzip-compressed sources
//! - Skipping tiles by seeking over their payload
//! - Detection of framing corruption

use std::io::{Cursor, Write};

use evtstore::fits::{
    CompressedBlock, CompressionDescriptor, CompressionProcess, RowOrdering, Tile, TileHeader,
    TileWalker, TILE_HEADER_SIZE,
};
use evtstore::{StoreError, ZStream};
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_tile(rows: u32, seed: u8) -> Tile {
    let time = CompressedBlock::new(
        CompressionDescriptor::single(CompressionProcess::Raw, RowOrdering::ByColumn),
        vec![seed; rows as usize * 4],
    );
    let data = CompressedBlock::new(
        CompressionDescriptor::new(
            vec![CompressionProcess::Smoothing, CompressionProcess::Huffman16],
            RowOrdering::ByColumn,
        )
        .unwrap(),
        (0..rows * 3).map(|i| (i as u8).wrapping_add(seed)).collect(),
    );
    Tile::new(rows, vec![time, data])
}

fn encode_tiles(tiles: &[Tile]) -> Vec<u8> {
    tiles.iter().flat_map(|t| t.to_bytes()).collect()
}

// =============================================================================
// Tile Header Tests
// =============================================================================

#[test]
fn test_tile_header_layout() {
    let bytes = TileHeader::new(100, 4096).to_bytes();
    assert_eq!(bytes.len(), TILE_HEADER_SIZE);
    assert_eq!(&bytes[0..4], b"TILE");
    assert_eq!(&bytes[4..8], &100u32.to_ne_bytes());
    assert_eq!(&bytes[8..16], &4096u64.to_ne_bytes());
}

#[test]
fn test_tile_header_decode() {
    let header = TileHeader::new(7, 123_456_789_012);
    assert_eq!(TileHeader::decode(&header.to_bytes()).unwrap(), header);
}

#[test]
fn test_tile_header_bad_tag() {
    let mut bytes = TileHeader::new(1, 1).to_bytes();
    bytes[0] = b'X';
    assert!(matches!(TileHeader::decode(&bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_tile_header_truncated() {
    let bytes = TileHeader::new(1, 1).to_bytes();
    assert!(matches!(
        TileHeader::decode(&bytes[..10]),
        Err(StoreError::Framing(_))
    ));
}

#[test]
fn test_tile_size_excludes_header() {
    let tile = sample_tile(10, 0);
    let encoded = tile.to_bytes();
    assert_eq!(encoded.len() as u64, TILE_HEADER_SIZE as u64 + tile.header.size);
}

// =============================================================================
// Walker Tests
// =============================================================================

#[test]
fn test_walk_tiles_in_memory() {
    let tiles = vec![sample_tile(10, 1), sample_tile(20, 2), sample_tile(5, 3)];
    let mut walker = TileWalker::new(Cursor::new(encode_tiles(&tiles)));

    for expected in &tiles {
        let tile = walker.next_tile().unwrap().unwrap();
        assert_eq!(&tile, expected);
        assert_eq!(tile.blocks[1].descriptor.num_processes(), 2);
    }

    assert!(walker.next_tile().unwrap().is_none());
    assert_eq!(walker.tiles_read(), 3);
}

#[test]
fn test_skip_tile_then_read() {
    let tiles = vec![sample_tile(10, 1), sample_tile(20, 2)];
    let mut walker = TileWalker::new(Cursor::new(encode_tiles(&tiles)));

    let skipped = walker.skip_tile().unwrap().unwrap();
    assert_eq!(skipped, tiles[0].header);

    let tile = walker.next_tile().unwrap().unwrap();
    assert_eq!(tile, tiles[1]);
    assert!(walker.skip_tile().unwrap().is_none());
}

#[test]
fn test_walk_gzip_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tiles.fz.gz");

    let tiles: Vec<_> = (0..50).map(|i| sample_tile(64 + i, i as u8)).collect();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encode_tiles(&tiles)).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    // Small buffer so skips cross refills
    let mut stream = ZStream::with_buffer_size(256);
    stream.open_path(&path).unwrap();
    let mut walker = TileWalker::new(stream);

    for (i, expected) in tiles.iter().enumerate() {
        if i % 3 == 0 {
            assert_eq!(walker.skip_tile().unwrap().unwrap(), expected.header);
        } else {
            assert_eq!(&walker.next_tile().unwrap().unwrap(), expected);
        }
    }
    assert!(walker.next_tile().unwrap().is_none());
}

#[test]
fn test_truncated_tile_is_framing_error() {
    let mut bytes = sample_tile(10, 1).to_bytes();
    bytes.truncate(bytes.len() - 3);

    let mut walker = TileWalker::new(Cursor::new(bytes));
    assert!(matches!(walker.next_tile(), Err(StoreError::Framing(_))));
}

#[test]
fn test_block_overrunning_tile_is_framing_error() {
    let mut tile = sample_tile(10, 1);
    tile.header.size -= 1;

    let mut walker = TileWalker::new(Cursor::new(tile.to_bytes()));
    assert!(matches!(walker.next_tile(), Err(StoreError::Framing(_))));
}

#[test]
fn test_garbage_between_tiles() {
    let mut bytes = sample_tile(4, 1).to_bytes();
    bytes.extend_from_slice(b"JUNKJUNKJUNKJUNK");

    let mut walker = TileWalker::new(Cursor::new(bytes));
    assert!(walker.next_tile().unwrap().is_some());
    assert!(matches!(walker.next_tile(), Err(StoreError::Framing(_))));
}
