//! Record Log
//!
//! Append-only file of self-delimited `(identifier, payload)` records.
//! Records are addressed by the byte offset at which they start.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{EmberError, Result};
use crate::hash::Identifier;

use super::RECORD_HEADER_SIZE;

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: Identifier,
    pub payload: Bytes,
}

/// Append-only record file
pub struct RecordLog {
    /// Path of the backing file
    path: PathBuf,
    /// Read/write handle (appends always seek to the end first)
    file: File,
    /// Bytes known to hold complete appends
    len: u64,
}

impl RecordLog {
    /// Open or create the record log at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
        })
    }

    /// Append a record and return the offset it starts at
    ///
    /// The record is synced to disk before the offset is returned.
    pub fn append(&mut self, id: Identifier, payload: &[u8]) -> Result<u64> {
        let encoded = encode_record(id, payload)?;

        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&encoded)?;
        self.file.sync_data()?;

        self.len = offset + encoded.len() as u64;
        tracing::trace!(id, offset, bytes = encoded.len(), "appended record");
        Ok(offset)
    }

    /// Decode the record starting at `offset`
    ///
    /// Returns:
    /// - `Err(KeyNotFound)`: offset at or past the end of the log
    /// - `Err(Corruption)`: truncated record or checksum mismatch
    pub fn read(&mut self, offset: u64) -> Result<Record> {
        if offset >= self.len {
            return Err(EmberError::KeyNotFound);
        }
        if offset + RECORD_HEADER_SIZE > self.len {
            return Err(EmberError::Corruption(format!(
                "truncated record header at offset {}",
                offset
            )));
        }

        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        self.file.read_exact(&mut header)?;

        let stored_crc = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let id = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let payload_len = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);

        if offset + RECORD_HEADER_SIZE + payload_len as u64 > self.len {
            return Err(EmberError::Corruption(format!(
                "record at offset {} claims {} payload bytes past end of log",
                offset, payload_len
            )));
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.file.read_exact(&mut payload)?;

        let actual_crc = record_crc(&header[4..12], &payload);
        if actual_crc != stored_crc {
            return Err(EmberError::Corruption(format!(
                "record checksum mismatch at offset {}: stored {:#010x}, computed {:#010x}",
                offset, stored_crc, actual_crc
            )));
        }

        Ok(Record {
            id,
            payload: Bytes::from(payload),
        })
    }

    /// Force buffered data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Size of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `[crc(4)][id(4)][len(4)][payload]`, crc covering everything after itself
fn encode_record(id: Identifier, payload: &[u8]) -> Result<Vec<u8>> {
    let payload_len = u32::try_from(payload.len()).map_err(|_| {
        EmberError::Encoding(format!(
            "payload of {} bytes exceeds the record size limit",
            payload.len()
        ))
    })?;

    let mut fields = [0u8; 8];
    fields[0..4].copy_from_slice(&id.to_le_bytes());
    fields[4..8].copy_from_slice(&payload_len.to_le_bytes());
    let crc = record_crc(&fields, payload);

    let mut encoded = Vec::with_capacity(RECORD_HEADER_SIZE as usize + payload.len());
    encoded.extend_from_slice(&crc.to_le_bytes());
    encoded.extend_from_slice(&fields);
    encoded.extend_from_slice(payload);
    Ok(encoded)
}

fn record_crc(fields: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(fields);
    hasher.update(payload);
    hasher.finalize()
}
