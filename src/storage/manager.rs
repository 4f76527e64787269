//! Storage Manager
//!
//! Pairs the record log with the persisted index.
//!
//! ## Responsibilities
//! - Append payloads, then repoint the index at the new record
//! - Resolve identifiers to payloads through the index
//! - Reject records whose identifier disagrees with the index

use std::path::Path;

use bytes::Bytes;

use crate::error::{EmberError, Result};
use crate::hash::Identifier;

use super::{IndexFile, RecordLog};

/// Durable identifier → payload storage
pub struct StorageManager {
    /// Append-only payload file
    record_log: RecordLog,

    /// B-tree index plus its snapshot file
    index: IndexFile,
}

impl StorageManager {
    /// Open or create the record log and index
    pub fn open(record_log_path: &Path, index_path: &Path, min_degree: usize) -> Result<Self> {
        let record_log = RecordLog::open(record_log_path)?;
        let index = IndexFile::open(index_path, min_degree)?;

        tracing::debug!(
            record_log = %record_log_path.display(),
            record_log_bytes = record_log.len(),
            indexed = index.len(),
            "storage opened"
        );

        Ok(Self { record_log, index })
    }

    /// Durably store `payload` under `id`
    ///
    /// Appends a new record and then persists the index pointing at it.
    /// Either step failing fails the whole write.
    pub fn put(&mut self, id: Identifier, payload: &[u8]) -> Result<u64> {
        let offset = self.record_log.append(id, payload)?;
        self.index.insert(id, offset)?;
        Ok(offset)
    }

    /// Look up the newest payload stored under `id`
    ///
    /// Returns:
    /// - `Ok(Some(payload))`: record found and decoded
    /// - `Ok(None)`: identifier not indexed
    /// - `Err(_)`: indexed record unreadable or mismatched
    pub fn get(&mut self, id: Identifier) -> Result<Option<Bytes>> {
        let offset = match self.index.get(id) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let record = self.record_log.read(offset)?;
        if record.id != id {
            return Err(EmberError::Corruption(format!(
                "record at offset {} holds id {:#010x}, index expected {:#010x}",
                offset, record.id, id
            )));
        }

        Ok(Some(record.payload))
    }

    /// Number of indexed identifiers
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Size of the record log in bytes
    pub fn record_log_len(&self) -> u64 {
        self.record_log.len()
    }

    pub fn index(&self) -> &IndexFile {
        &self.index
    }

    pub fn record_log(&self) -> &RecordLog {
        &self.record_log
    }

    /// Sync the record log to disk
    pub fn sync(&mut self) -> Result<()> {
        self.record_log.sync()
    }
}
