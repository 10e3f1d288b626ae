//! Raw Writer
//!
//! Appends the framed blocks of one run to a new file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::mem;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::{Result, StoreError};

use super::block::{BlockHeader, BlockType, BLOCK_HEADER_SIZE, FORMAT_VERSION, MAGIC, NUM_BOARDS};
use super::headers::{
    Event, Identifier, RunDescription, RunHeader, EVENT_ALIGNMENT_SIZE, RUN_SUMMARY_SIZE,
};

/// Lifecycle of a `RawWriter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Created, no file yet
    Unopened,
    /// Header written, accepting events
    Open,
    /// End-of-file block written and flushed
    Closed,
    /// A write, flush or sync failed; the file is abandoned
    Failed,
}

/// Sequential writer of a raw event file
///
/// ```text
/// new() ──► Unopened ──open()──► Open ──close()──► Closed
///                                 │
///                                 └── any I/O failure ──► Failed
/// ```
///
/// Never overwrites: `open()` fails if the path already exists.
pub struct RawWriter {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    state: WriterState,
    /// Id of the next event block
    counter: u32,
    /// File offset of the run summary payload
    summary_offset: Option<u64>,
    bytes_written: u64,
    /// Reused record buffer for `write_event`
    scratch: Vec<u8>,
}

impl RawWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            out: None,
            state: WriterState::Unopened,
            counter: 0,
            summary_offset: None,
            bytes_written: 0,
            scratch: Vec::new(),
        }
    }

    /// Create the file and write everything that precedes the events
    ///
    /// Missing parent directories are created. An existing file is left
    /// untouched and reported as `StoreError::FileExists`.
    pub fn open(&mut self, run: &RunHeader, description: &RunDescription) -> Result<()> {
        if self.state != WriterState::Unopened {
            return Err(StoreError::WriterState(format!(
                "cannot open writer in state {:?}",
                self.state
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::FileExists(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        self.out = Some(BufWriter::new(file));
        self.state = WriterState::Open;
        self.counter = 0;
        self.bytes_written = 0;

        self.write_raw(&MAGIC.to_ne_bytes())?;

        let identifier = Identifier {
            device_id: description.device_id,
            run_id: run.run_id,
        };
        self.write_block(BlockType::Identifier, 0, &identifier.to_bytes())?;
        self.write_block(BlockType::RunHeader, 0, &run.to_bytes())?;

        for (id, board) in run.boards.iter().enumerate() {
            self.write_block(BlockType::BoardHeader, id as u32, &board.to_bytes())?;
        }

        // Reserved for totals known only at the end of the run
        self.summary_offset = Some(self.bytes_written + BLOCK_HEADER_SIZE as u64);
        self.write_block(BlockType::RunSummary, 0, &[0u8; RUN_SUMMARY_SIZE])?;

        info!(
            path = %self.path.display(),
            run = run.run_id,
            night = run.night,
            device = description.device_id,
            name = %description.name,
            boards = NUM_BOARDS,
            "Opened raw file"
        );

        Ok(())
    }

    /// Append one event and return the block id it was written with
    pub fn write_event(&mut self, event: &Event) -> Result<u32> {
        self.ensure_open()?;

        let mut scratch = mem::take(&mut self.scratch);
        scratch.resize(event.record_size(), 0);
        let result = event
            .encode_record(&mut scratch)
            .and_then(|_| self.write_event_record(&scratch));
        self.scratch = scratch;

        result
    }

    /// Append an already-encoded event record
    ///
    /// `record` starts with the alignment field and may be longer than the
    /// event it holds; the payload length is taken from the record header.
    pub fn write_event_record(&mut self, record: &[u8]) -> Result<u32> {
        self.ensure_open()?;

        let payload_len = Event::payload_len_of(record)?;
        let payload = &record[EVENT_ALIGNMENT_SIZE..EVENT_ALIGNMENT_SIZE + payload_len];

        let id = self.counter;
        self.write_block(BlockType::Event, id, payload)?;
        self.counter += 1;

        debug!(id, bytes = payload_len, "Wrote event");
        Ok(id)
    }

    /// Terminate the file and flush it to disk
    ///
    /// Closing an already closed writer is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            WriterState::Open => {}
            WriterState::Closed => return Ok(()),
            state => {
                return Err(StoreError::WriterState(format!(
                    "cannot close writer in state {:?}",
                    state
                )))
            }
        }

        let out = match self.out.take() {
            Some(out) => out,
            None => {
                self.state = WriterState::Failed;
                return Err(StoreError::WriterState("writer has no file".to_string()));
            }
        };

        let result = finish(out, |file| file.sync_all());
        self.state = if result.is_ok() {
            WriterState::Closed
        } else {
            WriterState::Failed
        };
        result?;

        info!(
            path = %self.path.display(),
            events = self.counter,
            bytes = self.bytes_written + BLOCK_HEADER_SIZE as u64,
            "Closed raw file"
        );

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of events written so far
    pub fn event_count(&self) -> u32 {
        self.counter
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset of the zeroed run summary payload, once the file is open
    pub fn summary_offset(&self) -> Option<u64> {
        self.summary_offset
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.state != WriterState::Open {
            return Err(StoreError::WriterState(format!(
                "cannot write in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn write_block(&mut self, kind: BlockType, id: u32, payload: &[u8]) -> Result<()> {
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::InvalidEvent(format!("block payload of {} bytes", payload.len()))
        })?;

        let header = BlockHeader::new(kind, FORMAT_VERSION, id, length);
        self.write_raw(&header.to_bytes())?;
        self.write_raw(payload)
    }

    /// Write bytes; on failure the writer is abandoned
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let result = match self.out.as_mut() {
            Some(out) => out.write_all(bytes),
            None => Err(io::Error::new(ErrorKind::NotConnected, "writer has no file")),
        };

        match result {
            Ok(()) => {
                self.bytes_written += bytes.len() as u64;
                Ok(())
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Raw write failed");
                self.out = None;
                self.state = WriterState::Failed;
                Err(StoreError::WriteFailed(e.to_string()))
            }
        }
    }
}

/// Write the end-of-file block, flush and sync
///
/// A failed EOF write is `WriteFailed`; a failed flush or sync is
/// `CloseFailed`.
fn finish<W: Write>(mut out: BufWriter<W>, sync: impl FnOnce(W) -> io::Result<()>) -> Result<()> {
    out.write_all(&BlockHeader::end_of_file().to_bytes())
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

    let inner = out
        .into_inner()
        .map_err(|e| StoreError::CloseFailed(e.error().to_string()))?;
    sync(inner).map_err(|e| StoreError::CloseFailed(e.to_string()))
}

impl Drop for RawWriter {
    fn drop(&mut self) {
        if self.state == WriterState::Open {
            if let Err(e) = self.close() {
                error!(path = %self.path.display(), error = %e, "Failed to close raw file on drop");
            }
        }
    }
}

impl std::fmt::Debug for RawWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawWriter")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("events", &self.counter)
            .finish()
    }
}
