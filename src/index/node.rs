//! B-tree nodes

use serde::{Deserialize, Serialize};

use crate::hash::Identifier;

/// One identifier → offset mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Identifier,
    pub offset: u64,
}

impl IndexEntry {
    pub fn new(id: Identifier, offset: u64) -> Self {
        Self { id, offset }
    }
}

/// A B-tree node
///
/// Entries are strictly ascending by identifier. Internal nodes hold exactly
/// `entries.len() + 1` children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub(super) leaf: bool,
    pub(super) entries: Vec<IndexEntry>,
    pub(super) children: Vec<Node>,
}

impl Node {
    pub(super) fn leaf() -> Self {
        Self {
            leaf: true,
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Position of the first entry whose identifier is `>= id`
    ///
    /// Returns `entries.len()` when every entry is smaller.
    pub(super) fn lower_bound(&self, id: Identifier) -> usize {
        self.entries.partition_point(|e| e.id < id)
    }

    pub(super) fn is_full(&self, t: usize) -> bool {
        self.entries.len() == 2 * t - 1
    }

    pub(super) fn search(&self, id: Identifier) -> Option<(&Node, usize)> {
        let pos = self.lower_bound(id);
        if pos < self.entries.len() && self.entries[pos].id == id {
            Some((self, pos))
        } else if self.leaf {
            None
        } else {
            self.children[pos].search(id)
        }
    }

    pub(super) fn find_mut(&mut self, id: Identifier) -> Option<&mut IndexEntry> {
        let pos = self.lower_bound(id);
        if pos < self.entries.len() && self.entries[pos].id == id {
            Some(&mut self.entries[pos])
        } else if self.leaf {
            None
        } else {
            self.children[pos].find_mut(id)
        }
    }

    /// Split the full child at `i`, lifting its median into `self`
    ///
    /// The left half keeps `t-1` entries (and `t` children), the new right
    /// sibling receives the other `t-1` entries (and `t` children).
    pub(super) fn split_child(&mut self, i: usize, t: usize) {
        let y = &mut self.children[i];

        let right_entries = y.entries.split_off(t);
        let median = y.entries.remove(t - 1);
        let right_children = if y.leaf {
            Vec::new()
        } else {
            y.children.split_off(t)
        };

        let z = Node {
            leaf: y.leaf,
            entries: right_entries,
            children: right_children,
        };

        self.entries.insert(i, median);
        self.children.insert(i + 1, z);
    }

    /// Insert into a node known not to be full
    pub(super) fn insert_non_full(&mut self, entry: IndexEntry, t: usize) {
        let mut i = self.lower_bound(entry.id);

        if self.leaf {
            self.entries.insert(i, entry);
            return;
        }

        if self.children[i].is_full(t) {
            self.split_child(i, t);
            if self.entries[i].id < entry.id {
                i += 1;
            }
        }
        self.children[i].insert_non_full(entry, t);
    }

    /// Entry count of this subtree, or `None` if its shape is invalid
    ///
    /// Checks entry order, per-node entry bounds and child counts. Used on
    /// trees that come from disk rather than from `insert`.
    pub(super) fn checked_len(&self, t: usize, is_root: bool) -> Option<usize> {
        let max = t.checked_mul(2)?.checked_sub(1)?;
        let n = self.entries.len();
        if n > max || (!is_root && n < t - 1) {
            return None;
        }
        if self.entries.windows(2).any(|w| w[0].id >= w[1].id) {
            return None;
        }

        if self.leaf {
            return self.children.is_empty().then_some(n);
        }
        if n == 0 || self.children.len() != n + 1 {
            return None;
        }

        let mut total = n;
        for child in &self.children {
            total += child.checked_len(t, false)?;
        }
        Some(total)
    }

    pub(super) fn height(&self) -> usize {
        match self.children.first() {
            Some(child) => 1 + child.height(),
            None => 1,
        }
    }
}
