//! # EmberKV
//!
//! An embedded key-value store with:
//! - FNV-1a hashed keys mapped to opaque byte payloads
//! - An in-memory B-tree index persisted as a snapshot file
//! - An append-only, checksummed record log
//! - An LRU cache with batched, timer-driven write flushing
//! - A plain-text write-ahead log written before every mutation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Store (get / set / batch_set)                 │
//! │                 one AccessLock for all callers               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐      ┌─────────────┐
//!   │     WAL     │          │   Buffer    │◄─────│ FlushTimer  │
//!   │  (Append)   │          │ LRU + batch │      │  (thread)   │
//!   └─────────────┘          └──────┬──────┘      └─────────────┘
//!                                   │ flush
//!                                   ▼
//!                           ┌───────────────┐
//!                           │StorageManager │
//!                           │ RecordLog +   │
//!                           │ IndexFile     │
//!                           └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hash;
pub mod lock;
pub mod index;
pub mod storage;
pub mod buffer;
pub mod wal;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::{Config, WalSyncStrategy};
pub use hash::{hash, Identifier};
pub use store::{Store, StoreStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
