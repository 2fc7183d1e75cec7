//! # LRU cache of recently read records
//!
//! A fixed-capacity map from key bytes to [`Record`] with
//! least-recently-used eviction. `get` and `set` both promote the touched
//! entry to most-recent. Entries live in a slab (`Vec`) threaded into a
//! doubly-linked recency list by index, with a `HashMap` for O(1) lookup.
//!
//! The engine uses this purely as a read accelerator: records land here on
//! every read and write, and a cached tombstone is still a valid answer
//! ("this key is deleted") that saves a full disk cascade.

use record::Record;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from cache construction.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache capacity must be a positive number, but {got} was given")]
    ZeroCapacity { got: usize },
}

/// Checks a capacity value. Shared with the engine's config validation.
pub fn validate_params(capacity: usize) -> Result<(), CacheError> {
    if capacity == 0 {
        return Err(CacheError::ZeroCapacity { got: capacity });
    }
    Ok(())
}

struct Node {
    rec: Record,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity LRU map from key to [`Record`].
pub struct LruCache {
    capacity: usize,
    map: HashMap<Vec<u8>, usize>,
    slab: Vec<Node>,
    free: Vec<usize>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used; evicted first.
    tail: Option<usize>,
}

impl LruCache {
    /// Creates a cache holding at most `capacity` records (≥ 1).
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        validate_params(capacity)?;
        Ok(Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slab: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        })
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the cached record for `key` and marks it most-recent.
    pub fn get(&mut self, key: &[u8]) -> Option<Record> {
        let idx = *self.map.get(key)?;
        self.unlink(idx);
        self.push_front(idx);
        Some(self.slab[idx].rec.clone())
    }

    /// Inserts or updates `rec` and marks it most-recent, evicting the
    /// least-recent entry when full.
    pub fn set(&mut self, rec: Record) {
        if let Some(&idx) = self.map.get(rec.key.as_slice()) {
            self.slab[idx].rec = rec;
            self.unlink(idx);
            self.push_front(idx);
            return;
        }

        if self.map.len() == self.capacity {
            let victim = self.tail.expect("full cache has a tail");
            self.unlink(victim);
            let evicted = &self.slab[victim].rec;
            self.map.remove(evicted.key.as_slice());
            self.free.push(victim);
        }

        let key = rec.key.clone();
        let idx = match self.free.pop() {
            Some(slot) => {
                self.slab[slot] = Node {
                    rec,
                    prev: None,
                    next: None,
                };
                slot
            }
            None => {
                self.slab.push(Node {
                    rec,
                    prev: None,
                    next: None,
                });
                self.slab.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.push_front(idx);
    }

    /// Drops the entry for `key`, returning it if it was present.
    pub fn remove(&mut self, key: &[u8]) -> Option<Record> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.free.push(idx);
        Some(self.slab[idx].rec.clone())
    }

    // ---- Recency list maintenance ----

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slab[idx].prev, self.slab[idx].next);
        match prev {
            Some(p) => self.slab[p].next = next,
            None if self.head == Some(idx) => self.head = next,
            None => {}
        }
        match next {
            Some(n) => self.slab[n].prev = prev,
            None if self.tail == Some(idx) => self.tail = prev,
            None => {}
        }
        self.slab[idx].prev = None;
        self.slab[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.slab[idx].next = self.head;
        self.slab[idx].prev = None;
        if let Some(h) = self.head {
            self.slab[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}
