//! Event Pipeline
//!
//! Producer/consumer glue between the memory pool and a raw writer.
//!
//! ```text
//!  producer ──acquire──► MemoryChunk ──submit──► [bounded channel] ──► writer thread
//!     ▲                                                                   │
//!     └──────────────── chunk dropped, returned to the pool ◄─────────────┘
//! ```
//!
//! Backpressure comes from two places: a full channel blocks `submit`, and an
//! exhausted pool blocks `acquire_blocking`.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::pool::MemoryChunk;
use crate::raw::{Event, RawWriter, WriterState};

/// Totals reported by the writer thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub events: u64,
    /// Event payload bytes written
    pub bytes: u64,
}

/// Cloneable handle for producers on other threads
#[derive(Debug, Clone)]
pub struct Submitter {
    sender: Sender<MemoryChunk>,
}

impl Submitter {
    /// Queue an encoded event record, blocking while the queue is full
    pub fn submit(&self, chunk: MemoryChunk) -> Result<()> {
        self.sender
            .send(chunk)
            .map_err(|_| StoreError::WriterState("writer thread has stopped".to_string()))
    }
}

/// A raw writer driven by its own thread
pub struct EventPipeline {
    submitter: Option<Submitter>,
    handle: Option<JoinHandle<Result<PipelineStats>>>,
}

impl EventPipeline {
    /// Start the writer thread; `writer` must already be open
    pub fn start(writer: RawWriter, queue_depth: usize) -> Result<Self> {
        if writer.state() != WriterState::Open {
            return Err(StoreError::WriterState(format!(
                "pipeline needs an open writer, got {:?}",
                writer.state()
            )));
        }

        let (sender, receiver) = channel::bounded(queue_depth);
        let handle = thread::Builder::new()
            .name("evtstore-writer".to_string())
            .spawn(move || run_writer(writer, receiver))?;

        debug!(queue_depth, "Started event pipeline");

        Ok(Self {
            submitter: Some(Submitter { sender }),
            handle: Some(handle),
        })
    }

    pub fn from_config(writer: RawWriter, config: &Config) -> Result<Self> {
        Self::start(writer, config.pipeline_queue_depth)
    }

    /// Queue an encoded event record, blocking while the queue is full
    ///
    /// Fails once the writer thread has stopped after an error; the chunk is
    /// then dropped and returns to its pool.
    pub fn submit(&self, chunk: MemoryChunk) -> Result<()> {
        match &self.submitter {
            Some(submitter) => submitter.submit(chunk),
            None => Err(StoreError::WriterState("pipeline is finished".to_string())),
        }
    }

    /// A handle producers on other threads can submit through
    ///
    /// Every handle must be dropped before `finish()` can return.
    pub fn submitter(&self) -> Option<Submitter> {
        self.submitter.clone()
    }

    /// Close the queue, let the writer drain it, close the file
    pub fn finish(mut self) -> Result<PipelineStats> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<PipelineStats> {
        self.submitter = None;

        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StoreError::WriteFailed("writer thread panicked".to_string()))?,
            None => Err(StoreError::WriterState("pipeline is finished".to_string())),
        }
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.shutdown() {
                error!(error = %e, "Event pipeline failed during drop");
            }
        }
    }
}

impl std::fmt::Debug for EventPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPipeline")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

fn run_writer(mut writer: RawWriter, receiver: Receiver<MemoryChunk>) -> Result<PipelineStats> {
    let mut stats = PipelineStats::default();

    for chunk in receiver {
        if let Err(e) = writer.write_event_record(&chunk) {
            error!(path = %writer.path().display(), error = %e, "Writer thread stopping");
            return Err(e);
        }
        stats.events += 1;
        stats.bytes += Event::payload_len_of(&chunk)? as u64;
    }

    writer.close()?;
    info!(events = stats.events, bytes = stats.bytes, "Event pipeline drained");

    Ok(stats)
}
