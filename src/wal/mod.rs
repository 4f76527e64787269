//! Write-Ahead Log (WAL) Module
//!
//! Records every `Set` before it is applied to the buffer.
//!
//! ## Responsibilities
//! - Append one line per `Set`, in invocation order
//! - Fail the `Set` before any in-memory mutation if the append fails
//! - Parse the log back for auditing
//!
//! The log is never truncated and is not replayed on open.
//!
//! ## File Format
//! ```text
//! Set <key> <payload>\n
//! Set <key> <payload>\n
//! ...
//! ```
//! Payload bytes are written verbatim (no escaping).

mod entry;
mod reader;
mod writer;

pub use entry::WalEntry;
pub use reader::WalReader;
pub use writer::WalWriter;
