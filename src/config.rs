//! Configuration for evtstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Main configuration for an acquisition/storage session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Output Configuration
    // -------------------------------------------------------------------------
    /// Root directory for run files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── YYYY/MM/DD/YYYYMMDD_RRR.bin
    pub data_dir: PathBuf,

    /// Device id written into the Identifier block of every raw file
    pub device_id: u32,

    // -------------------------------------------------------------------------
    // Memory Pool Configuration
    // -------------------------------------------------------------------------
    /// Size of one pool chunk (in bytes)
    pub pool_chunk_size: usize,

    /// Ceiling on the memory the pool may commit (in bytes)
    pub pool_max_memory: usize,

    // -------------------------------------------------------------------------
    // Stream Configuration
    // -------------------------------------------------------------------------
    /// Read-ahead buffer of a decompression stream (in bytes)
    pub stream_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Pipeline Configuration
    // -------------------------------------------------------------------------
    /// Number of filled chunks that may wait for the writer thread
    pub pipeline_queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./evtstore_data"),
            device_id: 0,
            pool_chunk_size: 1024 * 1024,          // 1 MB
            pool_max_memory: 256 * 1024 * 1024,    // 256 MB
            stream_buffer_size: 2048 * 1024 * 2,   // 4 MB
            pipeline_queue_depth: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values for consistency
    pub fn validate(&self) -> Result<()> {
        if self.pool_chunk_size == 0 {
            return Err(StoreError::Config("pool_chunk_size must be positive".to_string()));
        }
        if self.pool_max_memory < self.pool_chunk_size {
            return Err(StoreError::Config(format!(
                "pool_max_memory ({}) smaller than pool_chunk_size ({})",
                self.pool_max_memory, self.pool_chunk_size
            )));
        }
        if self.stream_buffer_size <= crate::stream::PUTBACK_SIZE {
            return Err(StoreError::Config(format!(
                "stream_buffer_size must exceed {} bytes",
                crate::stream::PUTBACK_SIZE
            )));
        }
        if self.pipeline_queue_depth == 0 {
            return Err(StoreError::Config("pipeline_queue_depth must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all run files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the device id recorded in raw files
    pub fn device_id(mut self, id: u32) -> Self {
        self.config.device_id = id;
        self
    }

    /// Set the pool chunk size (in bytes)
    pub fn pool_chunk_size(mut self, size: usize) -> Self {
        self.config.pool_chunk_size = size;
        self
    }

    /// Set the pool memory ceiling (in bytes)
    pub fn pool_max_memory(mut self, size: usize) -> Self {
        self.config.pool_max_memory = size;
        self
    }

    /// Set the read-ahead buffer size of decompression streams (in bytes)
    pub fn stream_buffer_size(mut self, size: usize) -> Self {
        self.config.stream_buffer_size = size;
        self
    }

    /// Set the depth of the writer queue
    pub fn pipeline_queue_depth(mut self, depth: usize) -> Self {
        self.config.pipeline_queue_depth = depth;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
