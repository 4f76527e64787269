//! Index Module
//!
//! In-memory B-tree mapping identifiers to record log offsets.
//!
//! ## Responsibilities
//! - Ordered identifier → offset lookups
//! - Proactive top-down splitting on insert (no second pass)
//! - Serializable as one unit for the index snapshot file
//!
//! ## Shape (minimum degree t)
//! ```text
//!                 ┌──────────────┐
//!                 │   [ 40 ]     │   root: 0..=2t-1 entries
//!                 └──┬────────┬──┘
//!                    │        │
//!        ┌───────────▼─┐    ┌─▼───────────┐
//!        │ [10 20 30]  │    │ [50 60]     │   t-1..=2t-1 entries
//!        └─────────────┘    └─────────────┘
//! ```
//! Every node owns its children outright; there are no parent pointers.

mod node;
mod tree;

pub use node::{IndexEntry, Node};
pub use tree::{BTree, Iter};
