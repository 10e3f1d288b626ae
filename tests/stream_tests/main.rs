//! Seekable decompression stream tests

mod seek_proptests;

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Deterministic, moderately compressible test payload
pub fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 7) ^ (i >> 5)) as u8).collect()
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn write_gzip(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, gzip(data)).unwrap();
    path
}
