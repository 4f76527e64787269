//! Buffer Module
//!
//! Read cache and write batching in front of storage.
//!
//! ## Responsibilities
//! - Serve hot payloads from an exact-LRU cache
//! - Make writes visible immediately, persist them in batches
//! - Flush when the batch is full or its deadline passes
//!
//! ## Write Path
//! ```text
//!   put(id, payload)
//!        │
//!        ├──► LruCache (insert/promote, evict tail)
//!        │
//!        └──► pending queue ──(len == batch_capacity)──► flush
//!                  │
//!                  └──(first entry arms deadline)──► FlushTimer ──► flush_if_due
//! ```

mod cache;
mod timer;
mod write_buffer;

use bytes::Bytes;

use crate::hash::Identifier;

pub use cache::LruCache;
pub use timer::{FlushTimer, TimerHandle};
pub use write_buffer::Buffer;

/// A write queued for the next flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub id: Identifier,
    pub payload: Bytes,
}

impl PendingWrite {
    pub fn new(id: Identifier, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}
