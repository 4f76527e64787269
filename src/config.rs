//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EmberError, Result};

/// Main configuration for an EmberKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // File Configuration
    // -------------------------------------------------------------------------
    /// Append-only record log holding the payloads
    pub record_log_path: PathBuf,

    /// Snapshot of the B-tree index, rewritten on every flushed write
    pub index_path: PathBuf,

    /// Plain-text write-ahead log
    pub wal_path: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Buffer Configuration
    // -------------------------------------------------------------------------
    /// Number of payloads kept in the LRU cache
    pub cache_capacity: usize,

    /// Pending writes that force a synchronous flush
    pub batch_capacity: usize,

    /// Longest time a non-empty batch may wait before it is flushed
    pub flush_interval: Duration,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// B-tree minimum degree used when a fresh index is created
    pub min_degree: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Config {
    /// Default file name of the record log inside a data directory
    pub const RECORD_LOG_FILENAME: &'static str = "store.db";
    /// Default file name of the index snapshot inside a data directory
    pub const INDEX_FILENAME: &'static str = "store.idx";
    /// Default file name of the write-ahead log inside a data directory
    pub const WAL_FILENAME: &'static str = "wa.log";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration for values the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(EmberError::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.batch_capacity == 0 {
            return Err(EmberError::Config(
                "batch_capacity must be at least 1".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(EmberError::Config(
                "flush_interval must be non-zero".to_string(),
            ));
        }
        if self.min_degree < 2 {
            return Err(EmberError::Config(format!(
                "min_degree must be at least 2, got {}",
                self.min_degree
            )));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(EmberError::Config(
                "WAL sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn paths_in(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        (
            dir.join(Self::RECORD_LOG_FILENAME),
            dir.join(Self::INDEX_FILENAME),
            dir.join(Self::WAL_FILENAME),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let (record_log_path, index_path, wal_path) =
            Self::paths_in(Path::new("./emberkv_data"));
        Self {
            record_log_path,
            index_path,
            wal_path,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            cache_capacity: 100,
            batch_capacity: 100,
            flush_interval: Duration::from_secs(60),
            min_degree: 3,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Place all three files inside `path` using the default file names
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        let (record_log, index, wal) = Config::paths_in(path.as_ref());
        self.config.record_log_path = record_log;
        self.config.index_path = index;
        self.config.wal_path = wal;
        self
    }

    /// Set the record log path
    pub fn record_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.record_log_path = path.into();
        self
    }

    /// Set the index snapshot path
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    /// Set the write-ahead log path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the LRU cache capacity (entries)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the number of pending writes that forces a flush
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_capacity = capacity;
        self
    }

    /// Set the maximum age of a pending batch
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Set the B-tree minimum degree for newly created indexes
    pub fn min_degree(mut self, t: usize) -> Self {
        self.config.min_degree = t;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
