//! Storage Module
//!
//! Durable layer: an append-only record log plus a snapshot of the B-tree
//! index that maps identifiers to record offsets.
//!
//! ## Record Log Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Record (repeated, addressed by start offset)            │
//! │   CRC: u32 (4) | Id: u32 (4) | Len: u32 (4) | Payload   │
//! │   (CRC covers Id, Len and Payload)                      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Index File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                       │
//! │   Magic: "EKVI" (4) | Version: u16 (2) | CRC: u32 (4)   │
//! │   BodyLen: u64 (8)                                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Body: bincode-encoded B-tree (rewritten on every write) │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Superseded records are never reclaimed.

mod index_file;
mod manager;
mod record_log;

pub use index_file::IndexFile;
pub use manager::StorageManager;
pub use record_log::{Record, RecordLog};

// =============================================================================
// Shared Constants
// =============================================================================

/// Record header: CRC (4) + Id (4) + PayloadLen (4) = 12 bytes
pub(crate) const RECORD_HEADER_SIZE: u64 = 12;

/// Magic bytes identifying an EmberKV index snapshot
pub(crate) const INDEX_MAGIC: &[u8; 4] = b"EKVI";

/// Current index snapshot format version
pub(crate) const INDEX_VERSION: u16 = 1;

/// Index header: Magic (4) + Version (2) + CRC (4) + BodyLen (8) = 18 bytes
pub(crate) const INDEX_HEADER_SIZE: usize = 18;
