//! Write buffer
//!
//! LRU cache plus a queue of pending writes in front of the storage manager.

use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::Result;
use crate::hash::Identifier;
use crate::storage::StorageManager;

use super::{LruCache, PendingWrite, TimerHandle};

/// Cache and write-coalescing layer
///
/// Writes land in the cache immediately (read-your-writes) and are queued.
/// The queue is flushed to storage when it reaches `batch_capacity`, or when
/// `flush_interval` has elapsed since the queue became non-empty.
pub struct Buffer {
    /// Recently read or written payloads
    cache: LruCache,

    /// Writes not yet in storage, in enqueue order
    pending: Vec<PendingWrite>,

    /// Queue length that forces a synchronous flush
    batch_capacity: usize,

    /// Longest time a non-empty queue may wait
    flush_interval: Duration,

    /// When the current queue must be flushed (None when the queue is empty)
    deadline: Option<Instant>,

    /// Wakes the timer thread when a deadline is armed
    timer: Option<TimerHandle>,

    /// Record log + index
    storage: StorageManager,
}

impl Buffer {
    pub fn new(
        storage: StorageManager,
        cache_capacity: usize,
        batch_capacity: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            cache: LruCache::new(cache_capacity),
            pending: Vec::with_capacity(batch_capacity),
            batch_capacity: batch_capacity.max(1),
            flush_interval,
            deadline: None,
            timer: None,
            storage,
        }
    }

    /// Notify `timer` whenever a flush deadline is armed
    pub fn attach_timer(&mut self, timer: TimerHandle) {
        self.timer = Some(timer);
    }

    /// Read `id` from the cache, falling back to storage
    ///
    /// A storage hit is cached. Storage errors are logged and reported as a
    /// miss.
    pub fn get(&mut self, id: Identifier) -> Option<Bytes> {
        if let Some(value) = self.cache.get(id) {
            tracing::trace!(id, "cache hit");
            return Some(value);
        }

        match self.storage.get(id) {
            Ok(Some(value)) => {
                self.cache_insert(id, value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(id, error = %e, "record unreadable; treating as not found");
                None
            }
        }
    }

    /// Cache and enqueue one write
    pub fn put(&mut self, id: Identifier, payload: Bytes) -> Result<()> {
        self.cache_insert(id, payload.clone());

        self.pending.push(PendingWrite { id, payload });
        if self.pending.len() == 1 {
            self.arm_deadline();
        }

        if self.pending.len() >= self.batch_capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Cache and enqueue several writes, checking the batch limit once
    pub fn put_batch(&mut self, writes: Vec<PendingWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        if self.pending.is_empty() {
            self.arm_deadline();
        }

        for write in &writes {
            self.cache_insert(write.id, write.payload.clone());
        }
        self.pending.extend(writes);

        if self.pending.len() >= self.batch_capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Write every pending entry to storage, in enqueue order
    ///
    /// Stops at the first failure. The queue is emptied either way: entries
    /// after the failing one are dropped, not retried. Returns the number of
    /// entries written.
    pub fn flush(&mut self) -> Result<usize> {
        self.deadline = None;

        let batch = std::mem::take(&mut self.pending);
        let total = batch.len();
        if total == 0 {
            return Ok(0);
        }

        for (written, write) in batch.iter().enumerate() {
            if let Err(e) = self.storage.put(write.id, &write.payload) {
                tracing::error!(
                    written,
                    dropped = total - written,
                    error = %e,
                    "flush aborted; remaining pending writes discarded"
                );
                return Err(e);
            }
        }

        tracing::debug!(count = total, indexed = self.storage.index_len(), "flushed pending writes");
        Ok(total)
    }

    /// Flush if the armed deadline is at or before `now`
    ///
    /// Returns whether a flush ran.
    pub fn flush_if_due(&mut self, now: Instant) -> Result<bool> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.flush()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Deadline of the current batch, if one is pending
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Identifiers waiting to be flushed, in enqueue order
    pub fn pending_ids(&self) -> Vec<Identifier> {
        self.pending.iter().map(|w| w.id).collect()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, id: Identifier) -> bool {
        self.cache.contains(id)
    }

    /// Cached identifiers from most to least recently used
    pub fn cached_ids(&self) -> Vec<Identifier> {
        self.cache.ids()
    }

    /// Drop `id` from the cache (the stored copy is untouched)
    pub fn evict(&mut self, id: Identifier) -> bool {
        self.cache.remove(id).is_some()
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageManager {
        &mut self.storage
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn cache_insert(&mut self, id: Identifier, value: Bytes) {
        if let Some(evicted) = self.cache.insert(id, value) {
            tracing::trace!(evicted, "cache eviction");
        }
    }

    fn arm_deadline(&mut self) {
        let deadline = Instant::now() + self.flush_interval;
        self.deadline = Some(deadline);
        if let Some(timer) = &self.timer {
            timer.arm(deadline);
        }
    }
}
