//! Property-based tests for ZStream seeking.
//!
//! Any sequence of seeks and reads on a stream over a gzip file must yield the
//! same bytes as the same sequence on the decompressed data held in memory.

use std::io::{Cursor, Read, Seek, SeekFrom};

use evtstore::stream::{Origin, ZStream};
use proptest::prelude::*;
use tempfile::TempDir;

use crate::write_gzip;

#[derive(Debug, Clone)]
enum Op {
    /// Absolute seek, as a fraction (per mille) of the data length plus slack
    SeekStart(u32),
    SeekCurrent(i32),
    Read(usize),
    ReadToEnd,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0u32..1100).prop_map(Op::SeekStart),
        2 => (-600i32..600).prop_map(Op::SeekCurrent),
        // Short backward steps land in the putback region
        2 => (-24i32..0).prop_map(Op::SeekCurrent),
        3 => (0usize..400).prop_map(Op::Read),
        1 => Just(Op::ReadToEnd),
    ]
}

fn buffer_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        3 => 5usize..24,
        1 => 24usize..300,
    ]
}

fn read_up_to<R: Read>(reader: &mut R, n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    reader.by_ref().take(n as u64).read_to_end(&mut out).unwrap();
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Seeks and reads on the stream match a decompress-then-slice oracle.
    #[test]
    fn test_seek_read_matches_oracle(
        data in prop::collection::vec(0u8..16, 0..4000),
        buffer in buffer_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let temp = TempDir::new().unwrap();
        let path = write_gzip(temp.path(), "data.gz", &data);

        let mut stream = ZStream::with_buffer_size(buffer);
        stream.open_path(&path).unwrap();
        let mut oracle = Cursor::new(data.clone());

        for op in ops {
            match op {
                Op::SeekStart(per_mille) => {
                    let target = data.len() as u64 * per_mille as u64 / 1000;
                    let got = stream.seek_relative(target as i64, Origin::Beginning).unwrap();
                    let want = oracle.seek(SeekFrom::Start(target)).unwrap();
                    prop_assert_eq!(got, want);
                }
                Op::SeekCurrent(delta) => {
                    // Keep clear of the start; a negative target is a separate failure case
                    let position = oracle.position() as i64;
                    let delta = (delta as i64).max(-position);
                    let got = stream.seek_relative(delta, Origin::Current).unwrap();
                    let want = oracle.seek(SeekFrom::Current(delta)).unwrap();
                    prop_assert_eq!(got, want);
                }
                Op::Read(n) => {
                    prop_assert_eq!(read_up_to(&mut stream, n), read_up_to(&mut oracle, n));
                }
                Op::ReadToEnd => {
                    let mut got = Vec::new();
                    let mut want = Vec::new();
                    stream.read_to_end(&mut got).unwrap();
                    oracle.read_to_end(&mut want).unwrap();
                    prop_assert_eq!(got, want);
                }
            }

            prop_assert_eq!(stream.tell(), oracle.position());
            prop_assert!(!stream.is_failed());
        }
    }
}

/// Read to the end, then step back into the buffered window at every offset.
#[test]
fn test_seek_back_after_end_matches_oracle() {
    let temp = TempDir::new().unwrap();

    for buffer in 5usize..=16 {
        let data: Vec<u8> = (0..2 * buffer + 7).map(|i| (i * 31 % 251) as u8).collect();
        let path = write_gzip(temp.path(), &format!("data_{}.gz", buffer), &data);

        for k in 1..=(buffer + 4) as i64 {
            let mut stream = ZStream::with_buffer_size(buffer);
            stream.open_path(&path).unwrap();
            let mut oracle = Cursor::new(data.clone());

            let mut got = Vec::new();
            stream.read_to_end(&mut got).unwrap();
            assert_eq!(got, data);
            oracle.seek(SeekFrom::End(0)).unwrap();

            let got = stream.seek_relative(-k, Origin::Current).unwrap();
            let want = oracle.seek(SeekFrom::Current(-k)).unwrap();
            assert_eq!(got, want);

            for step in [1usize, 3, 64] {
                assert_eq!(
                    read_up_to(&mut stream, step),
                    read_up_to(&mut oracle, step),
                    "buffer {} back {} step {}",
                    buffer,
                    k,
                    step
                );
                assert_eq!(stream.tell(), oracle.position());
            }
        }
    }
}
