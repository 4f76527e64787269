//! WAL Writer
//!
//! Appends entry lines to the WAL file. The file is opened in append mode and
//! never truncated.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{EmberError, Result};

use super::WalEntry;

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    file: File,
    sync_strategy: WalSyncStrategy,
    /// Entries appended through this writer
    entries_written: u64,
    /// Entries appended since the last fsync
    uncommitted: usize,
}

impl WalWriter {
    /// Open or create a WAL file for appending
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            entries_written: 0,
            uncommitted: 0,
        })
    }

    /// Append one entry
    ///
    /// The line reaches the OS before this returns; fsync follows the sync
    /// strategy. A failed append leaves no bytes behind. Returns the number
    /// of entries written by this writer.
    pub fn append(&mut self, entry: &WalEntry) -> Result<u64> {
        self.write_encoded(&entry.encode(), 1)
    }

    /// Append several entries with a single write
    pub fn append_batch(&mut self, entries: &[WalEntry]) -> Result<u64> {
        if entries.is_empty() {
            return Ok(self.entries_written);
        }

        let mut buf = Vec::with_capacity(entries.iter().map(WalEntry::encoded_len).sum());
        for entry in entries {
            entry.encode_into(&mut buf);
        }
        self.write_encoded(&buf, entries.len())
    }

    fn write_encoded(&mut self, bytes: &[u8], entries: usize) -> Result<u64> {
        let start = self
            .file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| self.write_error(e))?;

        if let Err(e) = self.file.write_all(bytes) {
            // Cut any torn tail so a rejected entry never shows up in the log
            if let Err(trunc) = self.file.set_len(start) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %trunc,
                    "could not roll back partial WAL append"
                );
            }
            return Err(self.write_error(e));
        }

        self.entries_written += entries as u64;
        self.uncommitted += entries;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.uncommitted >= count {
                    self.sync()?;
                }
            }
        }

        Ok(self.entries_written)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Entries appended through this writer since it was opened
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Entries appended since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, err: std::io::Error) -> EmberError {
        EmberError::WalWrite(format!("{}: {}", self.path.display(), err))
    }
}
