//! # Skiplist — ordered in-memory map over Records
//!
//! The memtable's backing structure: a probabilistic multi-level linked
//! list keyed by raw key bytes (lexicographic order). Each node's height is
//! drawn by fair coin flips from a seeded RNG, so a given seed produces an
//! identical structure — tests rely on this.
//!
//! Nodes live in an arena (`Vec<Node>`) and link to each other by index,
//! which keeps the multi-level forward pointers safe without reference
//! counting. Removal is logical: the node's record gets its tombstone bit
//! set and stays linked until [`Skiplist::clear`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use record::{Record, STATUS_TOMBSTONE};
use thiserror::Error;

/// Errors from skiplist construction.
#[derive(Debug, Error)]
pub enum SkiplistError {
    #[error("maximum skiplist height is {max}, but {got} was given")]
    HeightAboveMax { got: usize, max: usize },

    #[error("minimum skiplist height is 1, but {got} was given")]
    HeightBelowMin { got: usize },
}

/// Checks that a (start height, max height) pair is usable. Shared with the
/// engine's config validation.
pub fn validate_params(level: usize, level_max: usize) -> Result<(), SkiplistError> {
    if level > level_max {
        return Err(SkiplistError::HeightAboveMax {
            got: level,
            max: level_max,
        });
    }
    if level == 0 {
        return Err(SkiplistError::HeightBelowMin { got: level });
    }
    Ok(())
}

struct Node {
    rec: Record,
    /// Forward pointer per level this node participates in.
    next: Vec<Option<usize>>,
}

/// Ordered map from key bytes to [`Record`], tombstone-aware.
pub struct Skiplist {
    /// Current height in use (≤ `level_max`).
    level: usize,
    level_max: usize,
    /// Header forward pointers, one per possible level.
    head: Vec<Option<usize>>,
    nodes: Vec<Node>,
    /// Entry count, including tombstoned entries.
    count: usize,
    rng: StdRng,
}

impl Skiplist {
    /// Creates an empty skiplist of starting height `level`, capped at
    /// `level_max`, with a deterministic coin-flip source seeded by `seed`.
    pub fn new(level: usize, level_max: usize, seed: u64) -> Result<Self, SkiplistError> {
        validate_params(level, level_max)?;
        Ok(Self {
            level,
            level_max,
            head: vec![None; level_max],
            nodes: Vec::new(),
            count: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of entries, including tombstoned ones.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drops every node and resets the height to 1. The RNG keeps its
    /// state so a cleared list stays deterministic across flush cycles.
    pub fn clear(&mut self) {
        self.level = 1;
        self.head = vec![None; self.level_max];
        self.nodes.clear();
        self.count = 0;
    }

    /// Upserts `rec`. If the key already exists the stored record is
    /// replaced in place (no relinking) and the previous record is
    /// returned; otherwise a new node is threaded in and `None` is
    /// returned.
    pub fn write(&mut self, rec: Record) -> Option<Record> {
        let mut update = vec![usize::MAX; self.level_max]; // usize::MAX = header
        let mut at: Option<usize> = None; // None = header

        for lvl in (0..self.level).rev() {
            loop {
                let next = self.forward(at, lvl);
                match next {
                    Some(idx) if self.nodes[idx].rec.key < rec.key => at = Some(idx),
                    _ => break,
                }
            }
            update[lvl] = at.map_or(usize::MAX, |i| i);
        }

        let candidate = self.forward(at, 0);
        if let Some(idx) = candidate {
            if self.nodes[idx].rec.key == rec.key {
                return Some(std::mem::replace(&mut self.nodes[idx].rec, rec));
            }
        }

        // New key: draw the node height by coin flips.
        let mut node_level = 1;
        while node_level < self.level_max && self.rng.gen_bool(0.5) {
            node_level += 1;
        }

        if node_level > self.level {
            for item in update.iter_mut().take(node_level).skip(self.level) {
                *item = usize::MAX;
            }
            self.level = node_level;
        }

        let new_idx = self.nodes.len();
        let mut next = Vec::with_capacity(node_level);
        for (lvl, item) in update.iter().enumerate().take(node_level) {
            let pred = *item;
            let succ = if pred == usize::MAX {
                self.head[lvl]
            } else {
                self.nodes[pred].next[lvl]
            };
            next.push(succ);
        }
        self.nodes.push(Node { rec, next });
        for (lvl, item) in update.iter().enumerate().take(node_level) {
            let pred = *item;
            if pred == usize::MAX {
                self.head[lvl] = Some(new_idx);
            } else {
                self.nodes[pred].next[lvl] = Some(new_idx);
            }
        }

        self.count += 1;
        None
    }

    /// Looks up `key`, returning the stored record whether or not its
    /// tombstone bit is set — callers interpret the tombstone.
    #[must_use]
    pub fn find(&self, key: &[u8]) -> Option<&Record> {
        self.locate(key).map(|idx| &self.nodes[idx].rec)
    }

    /// Marks the record under `key` as removed by setting its tombstone
    /// bit. The node stays linked. Missing keys are a no-op.
    pub fn remove(&mut self, key: &[u8]) {
        if let Some(idx) = self.locate(key) {
            self.nodes[idx].rec.status |= STATUS_TOMBSTONE;
        }
    }

    /// Iterates over records in ascending key order, tombstones included.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cur: self.head[0],
        }
    }

    fn locate(&self, key: &[u8]) -> Option<usize> {
        let mut at: Option<usize> = None;
        for lvl in (0..self.level).rev() {
            loop {
                match self.forward(at, lvl) {
                    Some(idx) if self.nodes[idx].rec.key.as_slice() < key => at = Some(idx),
                    _ => break,
                }
            }
        }
        match self.forward(at, 0) {
            Some(idx) if self.nodes[idx].rec.key == key => Some(idx),
            _ => None,
        }
    }

    fn forward(&self, at: Option<usize>, lvl: usize) -> Option<usize> {
        match at {
            None => self.head[lvl],
            Some(idx) => self.nodes[idx].next.get(lvl).copied().flatten(),
        }
    }
}

/// Ascending-order iterator over a [`Skiplist`]'s records.
pub struct Iter<'a> {
    list: &'a Skiplist,
    cur: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cur?;
        let node = &self.list.nodes[idx];
        self.cur = node.next[0];
        Some(&node.rec)
    }
}

#[cfg(test)]
mod tests;
