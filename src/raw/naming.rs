//! Run file naming
//!
//! Files of one night live in `dir/YYYY/MM/DD/` and are named
//! `YYYYMMDD_RRR.<ext>`, where `RRR` is the zero-padded run number.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StoreError};

/// Extensions a run may have been stored under
pub const KNOWN_EXTENSIONS: [&str; 6] = ["bin", "bin.gz", "fits", "fits.fz", "fits.gz", "drs.fits"];

/// Highest run number a night can hold
pub const MAX_RUN_NUMBER: u32 = 999;

/// Directory holding the files of `night` (YYYYMMDD)
pub fn night_dir(dir: impl AsRef<Path>, night: u32) -> PathBuf {
    dir.as_ref()
        .join(format!("{:04}", night / 10000))
        .join(format!("{:02}", night / 100 % 100))
        .join(format!("{:02}", night % 100))
}

/// File name without extension, e.g. `20111230_042`
pub fn run_file_stem(night: u32, run: u32) -> String {
    format!("{:08}_{:03}", night, run)
}

/// Full path of a run file
pub fn run_file_path(dir: impl AsRef<Path>, night: u32, run: u32, ext: &str) -> PathBuf {
    night_dir(dir, night).join(format!("{}.{}", run_file_stem(night, run), ext))
}

/// First free run number after the highest one already on disk
///
/// Returns 1 for an empty (or missing) night directory.
pub fn next_run_number(dir: impl AsRef<Path>, night: u32) -> Result<u32> {
    let dir = dir.as_ref();

    let mut highest = 0;
    for run in (1..=MAX_RUN_NUMBER).rev() {
        if run_exists(dir, night, run)? {
            highest = run;
            break;
        }
    }

    if highest == MAX_RUN_NUMBER {
        return Err(StoreError::RunNumbersExhausted);
    }

    debug!(night, next = highest + 1, dir = %dir.display(), "Next run number");
    Ok(highest + 1)
}

fn run_exists(dir: &Path, night: u32, run: u32) -> Result<bool> {
    for ext in KNOWN_EXTENSIONS {
        if run_file_path(dir, night, run, ext).try_exists()? {
            return Ok(true);
        }
    }
    Ok(false)
}
