//! # Engine — the core LSM storage engine
//!
//! Ties the [`memtable`], [`wal`], [`sstable`], and [`cache`] crates into a
//! complete single-node key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌────────────────────────────────────────────────────┐
//! │                      ENGINE                        │
//! │                                                    │
//! │ write.rs → WAL buffered append → cache → memtable  │
//! │               |                                    │
//! │               |  (flush policy fires?)             │
//! │               v            yes                     │
//! │            flush() → SSTable at level 1            │
//! │               |                                    │
//! │               |  (level holds lsm_run_max runs?)   │
//! │               v            yes                     │
//! │            compact() → merged run on next level    │
//! │                                                    │
//! │ read.rs → memtable → cache → per level, newest     │
//! │           run first: filter → summary → index →    │
//! │           data (first match wins)                  │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module         | Purpose                                          |
//! |----------------|--------------------------------------------------|
//! | `lib.rs`       | `Engine` struct, open, rate limiting, `Drop`     |
//! | [`config`]     | knobs, JSON load/dump, validation                |
//! | [`error`]      | the typed error taxonomy                         |
//! | [`bucket`]     | per-user token buckets                           |
//! | `write.rs`     | `put()`, `delete()`, internal apply + flush      |
//! | `read.rs`      | `get()`, the lookup cascade                      |
//! | `compaction.rs`| level-full detection, k-way merge into next level|
//! | `recovery.rs`  | WAL replay, incomplete-run cleanup               |
//!
//! ## Crash safety
//!
//! Every public write is appended to the WAL buffer before it touches the
//! memtable, and the buffer is spilled to segments before old segments are
//! truncated after a flush. On open, segments are replayed into a fresh
//! memtable and any SSTable run missing one of its five sibling files is
//! discarded — a partial group is the footprint of a build that a crash
//! interrupted.
//!
//! The engine is single-threaded cooperative: one operation at a time, and
//! reads never overlap a flush or compaction. All hot mutable state is
//! owned exclusively by the `Engine` instance, and two processes must not
//! share one database directory.

mod bucket;
mod compaction;
mod config;
mod error;
mod read;
mod recovery;
mod write;

pub use bucket::TokenBucket;
pub use config::Config;
pub use error::{EngineError, Result};

use cache::LruCache;
use memtable::Memtable;
use record::Record;
use std::collections::HashMap;
use tracing::debug;
use wal::Wal;

/// The central storage engine. See the crate docs for the architecture.
pub struct Engine {
    pub(crate) conf: Config,
    pub(crate) mem: Memtable,
    pub(crate) wal: Wal,
    pub(crate) cache: LruCache,
    /// Per-user rate buckets, stored as ordinary records keyed under the
    /// reserved internal prefix. Advisory bookkeeping: buckets never enter
    /// the WAL or the LSM tree.
    pub(crate) buckets: HashMap<Vec<u8>, Record>,
}

impl Engine {
    /// Opens (or creates) the database described by `conf`.
    ///
    /// # Startup steps
    ///
    /// 1. Validate the configuration; refuse to start on any bad value.
    /// 2. Create the data and WAL directories.
    /// 3. Discard SSTable runs missing any of their five sibling files.
    /// 4. Adopt the existing WAL segments (or create segment 0).
    /// 5. Replay every WAL record into a fresh memtable.
    pub fn open(conf: Config) -> Result<Self> {
        conf.validate()?;
        std::fs::create_dir_all(&conf.path)?;
        std::fs::create_dir_all(&conf.wal_path)?;

        recovery::discard_incomplete_runs(&conf.path, &conf.db_name)?;

        let wal = Wal::open(
            &conf.wal_path,
            &conf.db_name,
            conf.wal_max_recs_in_seg,
            conf.wal_lwm_idx,
            conf.wal_buffer_capacity,
        )?;

        let mut mem = Memtable::new(&conf.memtable_options()?)?;
        let replayed = recovery::replay_wal(&wal, &mut mem)?;
        if replayed > 0 {
            debug!(replayed, db = %conf.db_name, "recovered memtable from wal");
        }

        let cache = LruCache::new(conf.cache_capacity)?;

        Ok(Self {
            conf,
            mem,
            wal,
            cache,
            buckets: HashMap::new(),
        })
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.conf
    }

    /// Entries currently buffered in the memtable, tombstones included.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.mem.count()
    }

    // ---- Reserved-prefix and rate-limit gate, shared by every public op ----

    pub(crate) fn is_internal(&self, key: &[u8]) -> bool {
        key.starts_with(self.conf.internal_start.as_bytes())
    }

    pub(crate) fn check_legal(&self, key: &[u8]) -> Result<()> {
        if self.is_internal(key) {
            return Err(EngineError::IllegalKey);
        }
        Ok(())
    }

    /// Takes one token from `user`'s bucket, creating a full bucket on
    /// first contact. An empty bucket rejects the operation before it has
    /// any side effects.
    pub(crate) fn take_token(&mut self, user: &[u8]) -> Result<()> {
        let key = self.bucket_key(user);
        let mut bucket = self
            .buckets
            .get(&key)
            .and_then(|rec| TokenBucket::from_bytes(&rec.value))
            .unwrap_or_else(|| {
                TokenBucket::new(self.conf.token_bucket_tokens, self.conf.token_bucket_interval)
            });

        if !bucket.try_consume() {
            return Err(EngineError::RateLimited {
                retry_in_secs: bucket.retry_in_secs(),
            });
        }

        let rec = Record::new(key.clone(), bucket.to_bytes());
        self.buckets.insert(key, rec);
        Ok(())
    }

    fn bucket_key(&self, user: &[u8]) -> Vec<u8> {
        let mut key = self.conf.internal_start.as_bytes().to_vec();
        key.extend_from_slice(user);
        key
    }
}

/// Best-effort WAL buffer spill on drop, so a clean shutdown loses nothing.
/// Errors are ignored — `Drop` cannot propagate them, and records still
/// sitting in the buffer were never promised durability.
impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.wal.flush_buffer();
    }
}

#[cfg(test)]
mod tests;
