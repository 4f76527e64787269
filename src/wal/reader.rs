//! WAL Reader
//!
//! Parses the WAL back into entries for auditing.
//!
//! Parsing is best-effort: the line format has no escaping. A line starting
//! with `Set ` opens an entry whose key runs to the next space; any other line
//! continues the previous payload (re-joined with `\n`). Keys containing
//! spaces, and payloads containing `\nSet `, cannot be recovered exactly.

use std::fs;
use std::path::Path;

use bytes::Bytes;

use crate::error::Result;

use super::entry::SET_PREFIX;
use super::WalEntry;

/// Iterator over the entries of a WAL file
pub struct WalReader {
    data: Vec<u8>,
    pos: usize,
    /// Entry being assembled (key, payload so far)
    current: Option<(String, Vec<u8>)>,
    /// Lines that could not be attached to any entry
    malformed: u64,
}

impl WalReader {
    /// Read the whole WAL at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            current: None,
            malformed: 0,
        }
    }

    /// Read every remaining entry
    pub fn read_all(&mut self) -> Vec<WalEntry> {
        self.by_ref().collect()
    }

    /// Lines seen so far that belonged to no entry
    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }

    /// Byte range of the next line, without its terminator
    fn next_line(&mut self) -> Option<(usize, usize)> {
        if self.pos >= self.data.len() {
            return None;
        }

        let start = self.pos;
        let end = match self.data[start..].iter().position(|&b| b == b'\n') {
            Some(n) => {
                self.pos = start + n + 1;
                start + n
            }
            None => {
                // Unterminated final line (torn write)
                self.pos = self.data.len();
                self.data.len()
            }
        };
        Some((start, end))
    }
}

impl Iterator for WalReader {
    type Item = WalEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((start, end)) = self.next_line() else {
                return self.current.take().map(into_entry);
            };
            let line = &self.data[start..end];

            if let Some(rest) = line.strip_prefix(SET_PREFIX) {
                let (key, payload) = match rest.iter().position(|&b| b == b' ') {
                    Some(space) => (&rest[..space], &rest[space + 1..]),
                    None => (rest, &rest[rest.len()..]),
                };
                let opened = (String::from_utf8_lossy(key).into_owned(), payload.to_vec());

                if let Some(done) = self.current.replace(opened) {
                    return Some(into_entry(done));
                }
            } else if let Some((_, payload)) = self.current.as_mut() {
                payload.push(b'\n');
                payload.extend_from_slice(line);
            } else {
                self.malformed += 1;
            }
        }
    }
}

fn into_entry((key, payload): (String, Vec<u8>)) -> WalEntry {
    WalEntry {
        key,
        payload: Bytes::from(payload),
    }
}
