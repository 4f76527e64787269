//! LRU cache
//!
//! Fixed-capacity map from identifier to payload with exact least-recently-used
//! eviction. Entries live in a slab and are threaded onto a doubly linked list
//! by slot index (front = most recent), so lookups, promotion and eviction
//! are all O(1).

use std::collections::HashMap;

use bytes::Bytes;

use crate::hash::Identifier;

struct Slot {
    id: Identifier,
    value: Bytes,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded LRU cache of payloads
pub struct LruCache {
    capacity: usize,
    map: HashMap<Identifier, usize>,
    slots: Vec<Slot>,
    /// Slots vacated by `remove`, reused before the slab grows
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruCache {
    /// Create a cache holding at most `capacity` entries (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Look up `id` and promote it to most recently used
    pub fn get(&mut self, id: Identifier) -> Option<Bytes> {
        let idx = *self.map.get(&id)?;
        self.move_to_front(idx);
        Some(self.slots[idx].value.clone())
    }

    /// Look up `id` without touching recency
    pub fn peek(&self, id: Identifier) -> Option<&Bytes> {
        self.map.get(&id).map(|&idx| &self.slots[idx].value)
    }

    pub fn contains(&self, id: Identifier) -> bool {
        self.map.contains_key(&id)
    }

    /// Insert or replace `id`, making it most recently used
    ///
    /// Returns the identifier evicted to make room, if any.
    pub fn insert(&mut self, id: Identifier, value: Bytes) -> Option<Identifier> {
        if let Some(&idx) = self.map.get(&id) {
            self.slots[idx].value = value;
            self.move_to_front(idx);
            return None;
        }

        let mut evicted = None;
        let idx = if self.map.len() == self.capacity {
            // Reuse the tail slot for the new entry
            let tail = self.tail.unwrap_or_default();
            self.unlink(tail);
            let old_id = self.slots[tail].id;
            self.map.remove(&old_id);
            evicted = Some(old_id);

            self.slots[tail].id = id;
            self.slots[tail].value = value;
            tail
        } else if let Some(idx) = self.free.pop() {
            self.slots[idx].id = id;
            self.slots[idx].value = value;
            idx
        } else {
            self.slots.push(Slot {
                id,
                value,
                prev: None,
                next: None,
            });
            self.slots.len() - 1
        };

        self.push_front(idx);
        self.map.insert(id, idx);
        evicted
    }

    /// Drop `id` from the cache
    pub fn remove(&mut self, id: Identifier) -> Option<Bytes> {
        let idx = self.map.remove(&id)?;
        self.unlink(idx);
        self.free.push(idx);
        Some(std::mem::take(&mut self.slots[idx].value))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Identifiers from most to least recently used
    pub fn ids(&self) -> Vec<Identifier> {
        let mut ids = Vec::with_capacity(self.map.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            ids.push(self.slots[idx].id);
            cursor = self.slots[idx].next;
        }
        ids
    }

    /// Least recently used identifier (next to be evicted)
    pub fn lru(&self) -> Option<Identifier> {
        self.tail.map(|idx| self.slots[idx].id)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;

        if let Some(old_head) = self.head {
            self.slots[old_head].prev = Some(idx);
        }
        self.head = Some(idx);

        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}
