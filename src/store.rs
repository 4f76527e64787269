//! Store Module
//!
//! The orchestrator that coordinates all components.
//!
//! ## Responsibilities
//! - Log every `set` to the WAL before applying it
//! - Hash keys and route them through the buffer
//! - Serialize all access (including timed flushes) through one lock
//! - Own the flush timer thread

use std::fs;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Instant;

use bytes::Bytes;

use crate::buffer::{Buffer, FlushTimer, PendingWrite};
use crate::config::Config;
use crate::error::Result;
use crate::hash::{hash, Identifier};
use crate::lock::AccessLock;
use crate::storage::StorageManager;
use crate::wal::{WalEntry, WalWriter};

/// State guarded by the store lock
struct StoreState {
    wal: WalWriter,
    buffer: Buffer,
}

/// Point-in-time counters for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries in the LRU cache
    pub cached: usize,
    /// Writes waiting for the next flush
    pub pending: usize,
    /// Identifiers in the B-tree index
    pub indexed: usize,
    /// Size of the record log in bytes
    pub record_log_bytes: u64,
    /// WAL lines written since open
    pub wal_entries: u64,
}

/// An embedded key-value store
///
/// ## Concurrency Model
///
/// - **All operations** (get/set/batch_set/flush): serialized by one
///   `AccessLock`. Reads take it too, because a read may promote or fill the
///   cache.
/// - **Timed flushes**: run on the `emberkv-flush` thread, which takes the
///   same lock before touching the pending queue, record log or index.
/// - Disk I/O (WAL append, record append, index rewrite) happens while the
///   lock is held, so lock hold time includes write latency.
pub struct Store {
    /// Flush timer thread (stopped before the state is dropped)
    timer: Option<FlushTimer>,

    /// WAL + buffer behind the store lock
    state: Arc<AccessLock<StoreState>>,

    /// Store configuration
    config: Config,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config and create parent directories
    /// 2. Open the record log and load (or create) the index
    /// 3. Open the WAL in append mode
    /// 4. Start the flush timer
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        for path in [&config.record_log_path, &config.index_path, &config.wal_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let storage =
            StorageManager::open(&config.record_log_path, &config.index_path, config.min_degree)?;
        let wal = WalWriter::open(&config.wal_path, config.wal_sync_strategy)?;
        let buffer = Buffer::new(
            storage,
            config.cache_capacity,
            config.batch_capacity,
            config.flush_interval,
        );

        let state = Arc::new(AccessLock::new(StoreState { wal, buffer }));
        let timer = FlushTimer::spawn(timed_flush(Arc::downgrade(&state)))?;
        state.write().buffer.attach_timer(timer.handle());

        tracing::debug!(
            record_log = %config.record_log_path.display(),
            index = %config.index_path.display(),
            wal = %config.wal_path.display(),
            cache_capacity = config.cache_capacity,
            batch_capacity = config.batch_capacity,
            "store opened"
        );

        Ok(Self {
            timer: Some(timer),
            state,
            config,
        })
    }

    /// Open with default config rooted at `path`
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get the payload stored under `key`
    ///
    /// Any storage failure is reported as `None`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.read();
        let id = hash(key);
        state.buffer.get(id)
    }

    /// Store `payload` under `key`
    ///
    /// Steps:
    /// 1. Acquire write access
    /// 2. Append to the WAL (on failure nothing else changes)
    /// 3. Put into the buffer (may flush to the record log and index)
    pub fn set(&self, key: &str, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        let mut state = self.state.write();

        state.wal.append(&WalEntry::set(key, payload.clone()))?;

        let id = hash(key);
        tracing::trace!(key, id, bytes = payload.len(), "set");
        state.buffer.put(id, payload)
    }

    /// Store several pairs under one lock acquisition
    ///
    /// All WAL lines are written first, then the buffer is updated in one
    /// batch. Later pairs overwrite earlier ones with the same key.
    pub fn batch_set<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        let entries: Vec<WalEntry> = entries
            .into_iter()
            .map(|(key, payload)| WalEntry::set(key, payload))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();
        state.wal.append_batch(&entries)?;

        let writes = entries
            .into_iter()
            .map(|entry| PendingWrite {
                id: hash(&entry.key),
                payload: entry.payload,
            })
            .collect();
        state.buffer.put_batch(writes)
    }

    /// Flush pending writes now, regardless of batch size or deadline
    ///
    /// Returns the number of writes flushed.
    pub fn flush(&self) -> Result<usize> {
        self.state.write().buffer.flush()
    }

    /// Stop the timer, flush pending writes and sync all files
    pub fn close(mut self) -> Result<()> {
        self.stop_timer();

        let mut state = self.state.write();
        state.buffer.flush()?;
        state.wal.sync()?;
        state.buffer.storage_mut().sync()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            cached: state.buffer.cache_len(),
            pending: state.buffer.pending_len(),
            indexed: state.buffer.storage().index_len(),
            record_log_bytes: state.buffer.storage().record_log_len(),
            wal_entries: state.wal.entries_written(),
        }
    }

    /// Drop `key` from the cache so the next read goes to the record log
    pub fn evict_cached(&self, key: &str) -> bool {
        self.state.write().buffer.evict(hash(key))
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.state.read().buffer.is_cached(hash(key))
    }

    /// Cached identifiers from most to least recently used
    pub fn cached_ids(&self) -> Vec<Identifier> {
        self.state.read().buffer.cached_ids()
    }

    /// Identifiers waiting to be flushed, in enqueue order
    pub fn pending_ids(&self) -> Vec<Identifier> {
        self.state.read().buffer.pending_ids()
    }

    /// Whether `key` has a durable index entry
    pub fn is_indexed(&self, key: &str) -> bool {
        self.state
            .read()
            .buffer
            .storage()
            .index()
            .get(hash(key))
            .is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn stop_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.shutdown();
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.stop_timer();

        let mut state = self.state.write();
        if state.buffer.pending_len() > 0 {
            if let Err(e) = state.buffer.flush() {
                tracing::error!(error = %e, "flush on drop failed; pending writes lost");
            }
        }
    }
}

/// Timer callback: flush under the store lock once the deadline has passed
fn timed_flush(state: Weak<AccessLock<StoreState>>) -> impl FnMut() -> Option<Instant> + Send {
    move || {
        let state = state.upgrade()?;
        let mut guard = state.write();

        if let Err(e) = guard.buffer.flush_if_due(Instant::now()) {
            tracing::error!(error = %e, "timed flush failed");
        }

        let next = guard.buffer.flush_deadline();
        next
    }
}
