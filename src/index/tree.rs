//! B-tree over index entries

use serde::{Deserialize, Serialize};

use crate::hash::Identifier;

use super::node::{IndexEntry, Node};

/// B-tree of minimum degree `t`
///
/// Non-root nodes hold between `t-1` and `2t-1` entries and all leaves sit at
/// the same depth. The tree only grows in height through root splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BTree {
    root: Node,
    min_degree: usize,
    len: usize,
}

impl BTree {
    /// Create an empty tree
    ///
    /// `min_degree` must be at least 2 (checked by `Config::validate`).
    pub fn new(min_degree: usize) -> Self {
        debug_assert!(min_degree >= 2);
        Self {
            root: Node::leaf(),
            min_degree,
            len: 0,
        }
    }

    /// Build a tree by inserting `entries` in order
    pub fn from_entries(min_degree: usize, entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut tree = Self::new(min_degree);
        for entry in entries {
            tree.insert(entry.id, entry.offset);
        }
        tree
    }

    /// Locate `id`, returning the holding node and the entry position in it
    pub fn search(&self, id: Identifier) -> Option<(&Node, usize)> {
        self.root.search(id)
    }

    /// Offset recorded for `id`
    pub fn get(&self, id: Identifier) -> Option<u64> {
        self.search(id).map(|(node, pos)| node.entries[pos].offset)
    }

    pub fn contains(&self, id: Identifier) -> bool {
        self.search(id).is_some()
    }

    /// Insert `id → offset`
    ///
    /// An identifier that is already present has its offset replaced in
    /// place, so the newest offset always wins. Returns `true` when a new
    /// entry was added.
    pub fn insert(&mut self, id: Identifier, offset: u64) -> bool {
        if let Some(existing) = self.root.find_mut(id) {
            existing.offset = offset;
            return false;
        }

        let t = self.min_degree;
        let entry = IndexEntry::new(id, offset);

        if self.root.is_full(t) {
            let old_root = std::mem::replace(
                &mut self.root,
                Node {
                    leaf: false,
                    entries: Vec::new(),
                    children: Vec::new(),
                },
            );
            self.root.children.push(old_root);
            self.root.split_child(0, t);
        }
        self.root.insert_non_full(entry, t);

        self.len += 1;
        true
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Number of levels (an empty tree has height 1)
    pub fn height(&self) -> usize {
        self.root.height()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Whether every node has a valid shape and `len` matches the entries
    pub fn is_well_formed(&self) -> bool {
        self.min_degree >= 2 && self.root.checked_len(self.min_degree, true) == Some(self.len)
    }

    /// In-order iterator over all entries (ascending identifiers)
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.root)
    }
}

impl<'a> IntoIterator for &'a BTree {
    type Item = &'a IndexEntry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order traversal over a `BTree`
pub struct Iter<'a> {
    /// Path from the root to the current node with the next entry position
    stack: Vec<(&'a Node, usize)>,
}

impl<'a> Iter<'a> {
    fn new(root: &'a Node) -> Self {
        let mut iter = Self { stack: Vec::new() };
        iter.descend_left(root);
        iter
    }

    fn descend_left(&mut self, mut node: &'a Node) {
        loop {
            self.stack.push((node, 0));
            match node.children.first() {
                Some(child) if !node.leaf => node = child,
                _ => break,
            }
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, pos) = {
                let top = self.stack.last_mut()?;
                let current = (top.0, top.1);
                top.1 += 1;
                current
            };

            if pos < node.entries.len() {
                if !node.leaf {
                    self.descend_left(&node.children[pos + 1]);
                }
                return Some(&node.entries[pos]);
            }

            self.stack.pop();
        }
    }
}
