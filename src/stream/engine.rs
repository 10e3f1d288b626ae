//! Decompression Engine
//!
//! Sequential gzip (or pass-through) reader with absolute positioning in
//! decompressed coordinates.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

enum Source {
    Gzip(MultiGzDecoder<BufReader<File>>),
    Plain(BufReader<File>),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Gzip(decoder) => decoder.read(buf),
            Source::Plain(reader) => reader.read(buf),
        }
    }
}

/// Underlying engine of a [`ZStream`](super::ZStream)
///
/// Seeking follows zlib's `gzseek` for reading: forward seeks decompress and
/// discard, backward seeks restart from the beginning of the file. Seeking
/// past the end succeeds; reads there return 0.
pub(crate) struct ZEngine {
    /// Handle sharing the cursor of the reader inside `source`, for rewinds
    file: File,
    source: Source,
    compressed: bool,
    /// Offset in decompressed bytes
    position: u64,
}

impl ZEngine {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let rewind_handle = file.try_clone()?;
        let (source, compressed) = Self::make_source(file)?;

        Ok(Self {
            file: rewind_handle,
            source,
            compressed,
            position: 0,
        })
    }

    fn make_source(file: File) -> io::Result<(Source, bool)> {
        let mut reader = BufReader::new(file);
        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

        let source = if compressed {
            Source::Gzip(MultiGzDecoder::new(reader))
        } else {
            Source::Plain(reader)
        };
        Ok((source, compressed))
    }

    /// Whether the file is gzip-compressed (plain files are read as-is)
    pub(crate) fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Move to an absolute offset in decompressed bytes
    pub(crate) fn seek(&mut self, target: u64) -> io::Result<u64> {
        if target < self.position {
            self.rewind()?;
        }

        let skip = target - self.position;
        if skip > 0 {
            io::copy(&mut (&mut self.source).take(skip), &mut io::sink())?;
        }

        self.position = target;
        Ok(target)
    }

    fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let (source, compressed) = Self::make_source(self.file.try_clone()?)?;
        self.source = source;
        self.compressed = compressed;
        self.position = 0;
        Ok(())
    }
}
