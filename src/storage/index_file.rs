//! Index File
//!
//! Owns the B-tree and its on-disk snapshot. Every mutation rewrites the
//! whole snapshot (truncate, write, fsync) before it becomes visible.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{EmberError, Result};
use crate::hash::Identifier;
use crate::index::BTree;

use super::{INDEX_HEADER_SIZE, INDEX_MAGIC, INDEX_VERSION};

/// Persisted B-tree index
pub struct IndexFile {
    path: PathBuf,
    file: File,
    tree: BTree,
}

impl IndexFile {
    /// Open the snapshot at `path`
    ///
    /// An empty or missing file yields an empty tree of degree `min_degree`.
    /// An existing snapshot keeps the degree it was written with.
    pub fn open(path: &Path, min_degree: usize) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let tree = if file_len == 0 {
            BTree::new(min_degree)
        } else {
            let mut bytes = Vec::with_capacity(file_len as usize);
            file.seek(SeekFrom::Start(0))?;
            file.read_to_end(&mut bytes)?;
            decode_snapshot(&bytes)?
        };

        if tree.min_degree() != min_degree {
            tracing::warn!(
                persisted = tree.min_degree(),
                configured = min_degree,
                "index snapshot uses a different minimum degree; keeping the persisted one"
            );
        }

        tracing::debug!(path = %path.display(), entries = tree.len(), "index loaded");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            tree,
        })
    }

    /// Offset recorded for `id`
    pub fn get(&self, id: Identifier) -> Option<u64> {
        self.tree.get(id)
    }

    /// Point `id` at `offset` and persist the snapshot
    ///
    /// The in-memory tree only changes once the snapshot is on disk; a failed
    /// write leaves the previous tree in place and returns the error.
    pub fn insert(&mut self, id: Identifier, offset: u64) -> Result<()> {
        let mut candidate = self.tree.clone();
        candidate.insert(id, offset);

        self.persist(&candidate)?;
        self.tree = candidate;
        Ok(())
    }

    fn persist(&mut self, tree: &BTree) -> Result<()> {
        let snapshot = encode_snapshot(tree)?;

        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&snapshot)?;
        self.file.sync_all()?;

        tracing::trace!(entries = tree.len(), bytes = snapshot.len(), "index persisted");
        Ok(())
    }

    pub fn tree(&self) -> &BTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `[magic(4)][version(2)][crc(4)][body_len(8)][bincode body]`
pub(crate) fn encode_snapshot(tree: &BTree) -> Result<Vec<u8>> {
    let body = bincode::serialize(tree)?;
    let crc = crc32fast::hash(&body);

    let mut snapshot = Vec::with_capacity(INDEX_HEADER_SIZE + body.len());
    snapshot.extend_from_slice(INDEX_MAGIC);
    snapshot.extend_from_slice(&INDEX_VERSION.to_le_bytes());
    snapshot.extend_from_slice(&crc.to_le_bytes());
    snapshot.extend_from_slice(&(body.len() as u64).to_le_bytes());
    snapshot.extend_from_slice(&body);
    Ok(snapshot)
}

pub(crate) fn decode_snapshot(bytes: &[u8]) -> Result<BTree> {
    if bytes.len() < INDEX_HEADER_SIZE {
        return Err(EmberError::Corruption(format!(
            "index snapshot too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != INDEX_MAGIC {
        return Err(EmberError::Corruption(format!(
            "invalid index magic: expected EKVI, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != INDEX_VERSION {
        return Err(EmberError::Encoding(format!(
            "unsupported index version: {}",
            version
        )));
    }

    let stored_crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[10..18]);
    let body_len = u64::from_le_bytes(len_bytes) as usize;

    let body = &bytes[INDEX_HEADER_SIZE..];
    if body.len() != body_len {
        return Err(EmberError::Corruption(format!(
            "index body length mismatch: header says {}, found {}",
            body_len,
            body.len()
        )));
    }

    let actual_crc = crc32fast::hash(body);
    if actual_crc != stored_crc {
        return Err(EmberError::Corruption(format!(
            "index checksum mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, actual_crc
        )));
    }

    let tree: BTree = bincode::deserialize(body)?;
    if !tree.is_well_formed() {
        return Err(EmberError::Corruption(format!(
            "index snapshot holds a malformed tree (degree {}, {} entries)",
            tree.min_degree(),
            tree.len()
        )));
    }
    Ok(tree)
}
