//! Read path: `get()` and the lookup cascade.
//!
//! Freshest source first: memtable, then the LRU cache, then every on-disk
//! run from level 1 down, newest run first within a level. The first source
//! that knows the key wins — a tombstone anywhere shadows everything older,
//! and tombstoned hits are cached so a repeated miss stays cheap.

use crate::error::Result;
use crate::Engine;
use record::Record;
use sstable::TableReader;

impl Engine {
    /// Looks up `key` for `user`. Returns `None` when the key is absent or
    /// logically deleted.
    ///
    /// Rejected without side effects when `key` uses the reserved internal
    /// prefix or `user`'s token bucket is empty.
    pub fn get(&mut self, user: &[u8], key: &[u8]) -> Result<Option<Record>> {
        self.check_legal(key)?;
        self.take_token(user)?;

        self.lookup(key)
    }

    /// The internal lookup cascade, shared with `delete`.
    pub(crate) fn lookup(&mut self, key: &[u8]) -> Result<Option<Record>> {
        // 1. Memtable: freshest data, tombstones included. A memtable hit
        //    never falls through to older sources.
        if let Some(rec) = self.mem.find(key) {
            let rec = rec.clone();
            self.cache.set(rec.clone());
            return Ok(live(rec));
        }

        // 2. Cache: a cached tombstone is still a definitive answer.
        if let Some(rec) = self.cache.get(key) {
            return Ok(live(rec));
        }

        // 3. Disk: levels young to old, runs newest to oldest. Whatever is
        //    found is cached — deleted records included, since they may be
        //    probed again.
        let last_level = layout::last_level(&self.conf.path, &self.conf.db_name)?;
        for level in 1..=last_level {
            let last_run = layout::last_run(&self.conf.path, &self.conf.db_name, level as u32)?;
            for run in (0..=last_run).rev() {
                let reader =
                    TableReader::new(&self.conf.path, &self.conf.db_name, level as u32, run as u32);
                if let Some(rec) = reader.get(key)? {
                    self.cache.set(rec.clone());
                    return Ok(live(rec));
                }
            }
        }

        Ok(None)
    }
}

/// Maps a stored record to the public answer: tombstones read as absent.
fn live(rec: Record) -> Option<Record> {
    if rec.is_deleted() {
        None
    } else {
        Some(rec)
    }
}
