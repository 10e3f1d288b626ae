//! ZStream
//!
//! Buffered, seekable reader over a decompression engine.

use std::io::{self, BufRead, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, StoreError};

use super::engine::ZEngine;
use super::{Origin, DEFAULT_BUFFER_SIZE, PUTBACK_SIZE};

/// Read-only random-access stream over a compressed file
///
/// Failures are sticky: after a failed open, read or seek, `is_failed()`
/// returns true and further reads and seeks are refused until `clear()`.
///
/// Single-threaded; use one stream per reader thread.
pub struct ZStream {
    engine: Option<ZEngine>,
    buffer: Box<[u8]>,
    /// Start of the valid window (putback included)
    begin: usize,
    /// Read cursor
    pos: usize,
    /// End of the valid window
    end: usize,
    failed: bool,
    eof: bool,
}

impl ZStream {
    /// Create a closed stream with the default buffer size
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a closed stream with a custom read-ahead buffer
    ///
    /// # Panics
    ///
    /// Panics if `size` does not exceed `PUTBACK_SIZE`.
    pub fn with_buffer_size(size: usize) -> Self {
        assert!(
            size > PUTBACK_SIZE,
            "buffer size must exceed the putback region ({} bytes)",
            PUTBACK_SIZE
        );

        Self {
            engine: None,
            buffer: vec![0u8; size].into_boxed_slice(),
            begin: PUTBACK_SIZE,
            pos: PUTBACK_SIZE,
            end: PUTBACK_SIZE,
            failed: false,
            eof: false,
        }
    }

    /// Open `path`; check `is_failed()` afterwards
    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut stream = Self::new();
        let _ = stream.open_path(path);
        stream
    }

    /// Open `path`, turning a failed open into an error
    pub fn try_open(path: impl AsRef<Path>) -> Result<Self> {
        Self::try_open_with(path, &Config::default())
    }

    /// Open `path` with the buffer size from `config`
    pub fn try_open_with(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let mut stream = Self::with_buffer_size(config.stream_buffer_size);
        stream.open_path(path)?;
        Ok(stream)
    }

    /// Attach this stream to a file
    ///
    /// Fails (and sets the failed state) if a file is already open or the
    /// file cannot be opened.
    pub fn open_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if self.is_open() {
            self.failed = true;
            return Err(StoreError::StreamFailed(format!(
                "cannot open '{}': stream already open",
                path.display()
            )));
        }

        match ZEngine::open(path) {
            Ok(engine) => {
                debug!(
                    path = %path.display(),
                    compressed = engine.is_compressed(),
                    "Opened stream"
                );
                self.engine = Some(engine);
                self.reset_window();
                self.eof = false;
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open stream");
                self.failed = true;
                Err(StoreError::StreamFailed(format!(
                    "cannot open '{}': {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    /// Release the decompression engine; closing twice is a no-op
    pub fn close(&mut self) {
        if self.engine.take().is_some() {
            self.reset_window();
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Whether an open, read or seek has failed since the last `clear()`
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Whether the last refill hit the end of the data
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Reset the failed and end-of-stream flags
    pub fn clear(&mut self) {
        self.failed = false;
        self.eof = false;
    }

    /// Whether the underlying file is gzip-compressed
    pub fn is_compressed(&self) -> bool {
        self.engine.as_ref().map(|e| e.is_compressed()).unwrap_or(false)
    }

    /// Capacity of the read-ahead buffer, putback region included
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes decompressed but not yet consumed
    pub fn buffered(&self) -> usize {
        self.end - self.pos
    }

    /// Absolute read position in decompressed bytes
    pub fn tell(&self) -> u64 {
        match &self.engine {
            Some(engine) => engine.position() - self.buffered() as u64,
            None => 0,
        }
    }

    // =========================================================================
    // Seeking
    // =========================================================================

    /// Move the read position and return the new absolute position
    ///
    /// A target inside the buffered window only moves the cursor. Any other
    /// target is handed to the engine and the buffer is dropped, forcing a
    /// refill on the next read. `Origin::End` is not supported.
    pub fn seek_relative(&mut self, offset: i64, origin: Origin) -> Result<u64> {
        if self.failed {
            return Err(StoreError::StreamFailed("stream is in failed state".to_string()));
        }
        if origin == Origin::End {
            self.failed = true;
            return Err(StoreError::UnsupportedSeek);
        }

        if !self.is_open() {
            self.failed = true;
            return Err(StoreError::StreamFailed("stream is not open".to_string()));
        }
        let current = self.tell();

        // Only relative seeking, so already-decompressed data can be reused
        let delta = match origin {
            Origin::Beginning => i64::try_from(current)
                .ok()
                .and_then(|c| offset.checked_sub(c)),
            _ => Some(offset),
        };
        let delta = match delta {
            Some(d) => d,
            None => return Err(self.seek_failed(format!("offset {} out of range", offset))),
        };

        let absolute = match (current as i64).checked_add(delta) {
            Some(a) if a >= 0 => a as u64,
            _ => {
                return Err(self.seek_failed(format!(
                    "position {} {:+} is before the start of the stream",
                    current, delta
                )))
            }
        };

        // Target already decompressed: move the cursor
        let target = self.pos as i64 + delta;
        if target >= self.begin as i64 && target < self.end as i64 {
            self.pos = target as usize;
            self.eof = false;
            return Ok(absolute);
        }

        let result = match self.engine.as_mut() {
            Some(engine) => engine.seek(absolute),
            None => Err(io::Error::new(ErrorKind::NotConnected, "stream is not open")),
        };

        match result {
            Ok(pos) => {
                self.reset_window();
                self.eof = false;
                Ok(pos)
            }
            Err(e) => Err(self.seek_failed(e.to_string())),
        }
    }

    fn seek_failed(&mut self, message: String) -> StoreError {
        warn!(error = %message, "Seek failed");
        self.failed = true;
        StoreError::Seek(message)
    }

    // =========================================================================
    // Buffer Management
    // =========================================================================

    /// Empty the window so the next read refills
    fn reset_window(&mut self) {
        self.begin = PUTBACK_SIZE;
        self.pos = PUTBACK_SIZE;
        self.end = PUTBACK_SIZE;
    }

    /// Decompress the next chunk of data into the buffer
    ///
    /// Returns the number of new bytes; 0 means end of stream, in which case
    /// the window is left untouched.
    fn refill(&mut self) -> io::Result<usize> {
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => return Err(io::Error::new(ErrorKind::NotConnected, "stream is not open")),
        };

        // Up to PUTBACK_SIZE consumed bytes go in front of the new data. They
        // are only moved once new data exists; at end of stream the current
        // window (putback region included) must stay intact.
        let putback = (self.pos - self.begin).min(PUTBACK_SIZE);
        let mut saved = [0u8; PUTBACK_SIZE];
        saved[..putback].copy_from_slice(&self.buffer[self.pos - putback..self.pos]);

        let capacity = self.buffer.len() - PUTBACK_SIZE;
        let mut filled = 0;
        let mut failure = None;
        while filled < capacity {
            match engine.read(&mut self.buffer[PUTBACK_SIZE + filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure {
            // Part of the window may already be overwritten
            if filled > 0 {
                self.reset_window();
            }
            return Err(e);
        }

        if filled == 0 {
            return Ok(0);
        }

        self.buffer[PUTBACK_SIZE - putback..PUTBACK_SIZE].copy_from_slice(&saved[..putback]);
        self.begin = PUTBACK_SIZE - putback;
        self.pos = PUTBACK_SIZE;
        self.end = PUTBACK_SIZE + filled;

        Ok(filled)
    }
}

impl Default for ZStream {
    fn default() -> Self {
        Self::new()
    }
}

impl BufRead for ZStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.failed {
            return Err(io::Error::new(ErrorKind::Other, "stream is in failed state"));
        }

        if self.pos >= self.end {
            match self.refill() {
                Ok(0) => self.eof = true,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Refill failed");
                    self.failed = true;
                    return Err(e);
                }
            }
        }

        Ok(&self.buffer[self.pos..self.end])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.end);
    }
}

impl Read for ZStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl Seek for ZStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let result = match pos {
            SeekFrom::Start(n) => match i64::try_from(n) {
                Ok(n) => self.seek_relative(n, Origin::Beginning),
                Err(_) => Err(self.seek_failed(format!("offset {} out of range", n))),
            },
            SeekFrom::Current(delta) => self.seek_relative(delta, Origin::Current),
            SeekFrom::End(delta) => self.seek_relative(delta, Origin::End),
        };
        result.map_err(io::Error::from)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.tell())
    }
}

impl std::fmt::Debug for ZStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZStream")
            .field("open", &self.is_open())
            .field("failed", &self.failed)
            .field("eof", &self.eof)
            .field("position", &self.tell())
            .field("buffered", &self.buffered())
            .finish()
    }
}
