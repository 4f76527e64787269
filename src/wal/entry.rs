//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log lines.

use bytes::Bytes;

/// Prefix of every entry line
pub const SET_PREFIX: &[u8] = b"Set ";

/// One logged `Set` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Key as given by the caller (not the hashed identifier)
    pub key: String,

    /// Payload bytes, written verbatim
    pub payload: Bytes,
}

impl WalEntry {
    pub fn set(key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }

    /// Encoded size of this entry in bytes
    pub fn encoded_len(&self) -> usize {
        SET_PREFIX.len() + self.key.len() + 1 + self.payload.len() + 1
    }

    /// Append `Set <key> <payload>\n` to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(SET_PREFIX);
        buf.extend_from_slice(self.key.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(&self.payload);
        buf.push(b'\n');
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }
}
