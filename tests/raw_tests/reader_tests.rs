//! Tests for RawReader and scan
//!
//! These tests verify:
//! - Round trip of everything the writer produces
//! - Reading gzip-compressed raw files
//! - Detection of order violations, truncation and trailing data
//! - Skipping of unknown block types

use std::io::{Cursor, Write};

use evtstore::raw::{
    scan, BlockHeader, BlockType, Identifier, RawReader, RunHeader, BLOCK_HEADER_SIZE,
    MAX_BLOCK_PAYLOAD, NUM_BOARDS,
};
use evtstore::StoreError;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use crate::{sample_event, sample_run, write_run};

// =============================================================================
// Helper Functions
// =============================================================================

fn run_bytes(events: u32) -> Vec<u8> {
    let temp = TempDir::new().unwrap();
    let path = write_run(temp.path(), "run.bin", events);
    std::fs::read(path).unwrap()
}

/// Replace the end-of-file block with `extra`, then terminate again
fn insert_before_eof(mut bytes: Vec<u8>, extra: &[u8]) -> Vec<u8> {
    bytes.truncate(bytes.len() - BLOCK_HEADER_SIZE);
    bytes.extend_from_slice(extra);
    bytes.extend_from_slice(&BlockHeader::end_of_file().to_bytes());
    bytes
}

fn read_all(bytes: Vec<u8>) -> evtstore::Result<Vec<evtstore::raw::Block>> {
    RawReader::new(Cursor::new(bytes))?.collect()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip() {
    let blocks = read_all(run_bytes(10)).unwrap();
    assert_eq!(blocks.len(), 1 + 1 + NUM_BOARDS + 1 + 10 + 1);

    let identifier = Identifier::decode(&blocks[0].payload).unwrap();
    assert_eq!(identifier, Identifier { device_id: 12, run_id: 7 });

    let run = RunHeader::decode(&blocks[1].payload).unwrap();
    let expected = sample_run(7);
    assert_eq!(run.night, expected.night);
    assert_eq!(run.roi, expected.roi);
    assert_eq!(run.num_pixels, expected.num_pixels);
    assert_eq!(run.start_sec, expected.start_sec);

    let events: Vec<_> = blocks
        .iter()
        .filter(|b| b.kind() == Some(BlockType::Event))
        .map(|b| b.to_event().unwrap())
        .collect();
    assert_eq!(events.len(), 10);
    for (n, event) in events.iter().enumerate() {
        assert_eq!(event, &sample_event(n as u32));
    }

    assert_eq!(blocks.last().unwrap().kind(), Some(BlockType::EndOfFile));
}

#[test]
fn test_scan_summary() {
    let temp = TempDir::new().unwrap();
    let path = write_run(temp.path(), "scan.bin", 25);

    let summary = scan(&path).unwrap();
    assert_eq!(summary.identifier.run_id, 7);
    assert_eq!(summary.identifier.device_id, 12);
    assert_eq!(summary.events, 25);
    assert_eq!(summary.blocks, (1 + 1 + NUM_BOARDS + 1 + 25 + 1) as u64);
    assert_eq!(summary.boards_present(), 4);
    assert!(summary.run.boards[17].is_present());
    assert!(!summary.run.boards[18].is_present());
    assert_eq!(summary.skipped_blocks, 0);
}

#[test]
fn test_scan_gzip_file() {
    let temp = TempDir::new().unwrap();
    let plain = write_run(temp.path(), "run.bin", 40);

    let gz_path = temp.path().join("run.bin.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&std::fs::read(&plain).unwrap()).unwrap();
    std::fs::write(&gz_path, encoder.finish().unwrap()).unwrap();

    assert_eq!(scan(&gz_path).unwrap(), scan(&plain).unwrap());
}

#[test]
fn test_reader_finishes_cleanly() {
    let mut reader = RawReader::new(Cursor::new(run_bytes(1))).unwrap();
    while reader.next_block().unwrap().is_some() {}
    assert!(reader.is_finished());
    assert!(reader.next_block().unwrap().is_none());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_bad_magic() {
    let mut bytes = run_bytes(0);
    bytes[0] ^= 0xFF;
    assert!(matches!(
        RawReader::new(Cursor::new(bytes)),
        Err(StoreError::Framing(_))
    ));
}

#[test]
fn test_missing_end_of_file() {
    let mut bytes = run_bytes(3);
    bytes.truncate(bytes.len() - BLOCK_HEADER_SIZE);
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_truncated_event_payload() {
    let mut bytes = run_bytes(3);
    bytes.truncate(bytes.len() - BLOCK_HEADER_SIZE - 7);
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_trailing_data_after_eof() {
    let mut bytes = run_bytes(2);
    bytes.push(0);
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_out_of_order_header() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&evtstore::raw::MAGIC.to_ne_bytes());
    let run = RunHeader::default().to_bytes();
    bytes.extend_from_slice(
        &BlockHeader::new(BlockType::RunHeader, 1, 0, run.len() as u32).to_bytes(),
    );
    bytes.extend_from_slice(&run);

    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_event_id_gap() {
    let event = sample_event(5).to_record().unwrap();
    let payload = &event[2..];
    let mut block = BlockHeader::new(BlockType::Event, 1, 5, payload.len() as u32)
        .to_bytes()
        .to_vec();
    block.extend_from_slice(payload);

    // Run already holds events 0 and 1; id 5 skips ahead
    let bytes = insert_before_eof(run_bytes(2), &block);
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_eof_with_payload() {
    let mut bytes = run_bytes(0);
    let at = bytes.len() - BLOCK_HEADER_SIZE;
    bytes[at + 12..at + 16].copy_from_slice(&4u32.to_ne_bytes());
    bytes.extend_from_slice(&[0u8; 4]);
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_oversized_block_rejected() {
    let header = BlockHeader {
        block_type: 99,
        version: 1,
        id: 0,
        length: MAX_BLOCK_PAYLOAD + 1,
    };
    let bytes = insert_before_eof(run_bytes(0), &header.to_bytes());
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}

#[test]
fn test_error_stops_iteration() {
    let mut bytes = run_bytes(1);
    bytes.truncate(bytes.len() - BLOCK_HEADER_SIZE);

    let reader = RawReader::new(Cursor::new(bytes)).unwrap();
    let results: Vec<_> = reader.collect();
    assert!(results.last().unwrap().is_err());
    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
}

// =============================================================================
// Unknown Blocks
// =============================================================================

#[test]
fn test_unknown_block_skipped() {
    let mut block = BlockHeader {
        block_type: 42,
        version: 3,
        id: 0,
        length: 3,
    }
    .to_bytes()
    .to_vec();
    block.extend_from_slice(b"new");

    let bytes = insert_before_eof(run_bytes(2), &block);
    let mut reader = RawReader::new(Cursor::new(bytes)).unwrap();

    let mut events = 0;
    while let Some(block) = reader.next_block().unwrap() {
        assert!(block.kind().is_some());
        if block.kind() == Some(BlockType::Event) {
            events += 1;
        }
    }
    assert_eq!(events, 2);
    assert_eq!(reader.skipped_blocks(), 1);
}

#[test]
fn test_unknown_block_before_boards_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&evtstore::raw::MAGIC.to_ne_bytes());
    bytes.extend_from_slice(
        &BlockHeader {
            block_type: 42,
            version: 1,
            id: 0,
            length: 0,
        }
        .to_bytes(),
    );
    assert!(matches!(read_all(bytes), Err(StoreError::Framing(_))));
}
