//! # Memtable — the in-memory write buffer
//!
//! Wraps a [`skiplist::Skiplist`] with bookkeeping for the flush decision.
//! Writes accumulate here (tombstones included) until the flush policy
//! fires; the engine then streams [`Memtable::iter`] into a new SSTable and
//! calls [`Memtable::clear`].
//!
//! Two flush strategies exist and can be combined as a bitmask:
//!
//! - [`FLUSH_BY_CAPACITY`] — flush once the entry count reaches `capacity`.
//! - [`FLUSH_BY_THRESHOLD`] — flush once the tracked byte usage reaches
//!   `threshold_bytes`. Usage tracks encoded record sizes: inserts add the
//!   new record's size, updates adjust by the difference between the old
//!   and new sizes.

use record::Record;
use skiplist::{Skiplist, SkiplistError};
use thiserror::Error;

/// Flush when the entry count reaches the configured capacity.
pub const FLUSH_BY_CAPACITY: u8 = 1 << 0;
/// Flush when the tracked byte usage reaches the configured threshold.
pub const FLUSH_BY_THRESHOLD: u8 = 1 << 1;

/// Errors from memtable construction.
#[derive(Debug, Error)]
pub enum MemtableError {
    #[error("skiplist config: {0}")]
    Skiplist(#[from] SkiplistError),

    #[error("memtable capacity must be a positive number, but {got} was given")]
    ZeroCapacity { got: usize },

    #[error("memtable flush strategy must enable at least one of capacity/threshold")]
    NoStrategy,
}

/// Sizing and policy knobs, normally filled in from the engine config.
#[derive(Debug, Clone)]
pub struct MemtableOptions {
    pub skiplist_level: usize,
    pub skiplist_level_max: usize,
    pub skiplist_seed: u64,
    /// Record-count flush threshold.
    pub capacity: usize,
    /// Byte-usage flush threshold.
    pub threshold_bytes: u64,
    /// Bitmask of [`FLUSH_BY_CAPACITY`] and [`FLUSH_BY_THRESHOLD`].
    pub flush_strategy: u8,
}

/// Ordered, size-bounded buffer of the most recent writes.
pub struct Memtable {
    sl: Skiplist,
    usage: u64,
    capacity: usize,
    threshold: u64,
    strategy: u8,
}

impl Memtable {
    pub fn new(opts: &MemtableOptions) -> Result<Self, MemtableError> {
        if opts.capacity == 0 {
            return Err(MemtableError::ZeroCapacity { got: opts.capacity });
        }
        if opts.flush_strategy & (FLUSH_BY_CAPACITY | FLUSH_BY_THRESHOLD) == 0 {
            return Err(MemtableError::NoStrategy);
        }
        let sl = Skiplist::new(
            opts.skiplist_level,
            opts.skiplist_level_max,
            opts.skiplist_seed,
        )?;
        Ok(Self {
            sl,
            usage: 0,
            capacity: opts.capacity,
            threshold: opts.threshold_bytes,
            strategy: opts.flush_strategy,
        })
    }

    /// Inserts or updates `rec`, returning `true` if the key was new.
    pub fn add(&mut self, rec: Record) -> bool {
        let new_size = rec.encoded_len();
        match self.sl.write(rec) {
            Some(old) => {
                self.usage = self.usage + new_size - old.encoded_len();
                false
            }
            None => {
                self.usage += new_size;
                true
            }
        }
    }

    /// True when the configured flush policy says the buffer is full.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        (self.strategy & FLUSH_BY_CAPACITY != 0 && self.sl.count() >= self.capacity)
            || (self.strategy & FLUSH_BY_THRESHOLD != 0 && self.usage >= self.threshold)
    }

    /// Looks up `key`. Tombstoned records are returned as-is; callers check
    /// [`Record::is_deleted`].
    #[must_use]
    pub fn find(&self, key: &[u8]) -> Option<&Record> {
        self.sl.find(key)
    }

    /// Iterates over all records in ascending key order, tombstones
    /// included. Finite and restartable.
    pub fn iter(&self) -> skiplist::Iter<'_> {
        self.sl.iter()
    }

    /// Entry count, tombstones included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sl.count()
    }

    /// Tracked byte usage of the buffered records.
    #[must_use]
    pub fn usage(&self) -> u64 {
        self.usage
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sl.is_empty()
    }

    /// Empties the buffer after a successful flush.
    pub fn clear(&mut self) {
        self.sl.clear();
        self.usage = 0;
    }
}
