//! Write path: `put()`, `delete()`, the internal apply, and the flush.
//!
//! Every mutation is WAL-buffered first, then lands in the cache and the
//! memtable. When the memtable's flush policy fires, its contents stream
//! into a new level-1 SSTable run, compaction gets a chance to fold the
//! level forward, and the WAL is truncated down to its low-water mark.

use crate::error::Result;
use crate::{compaction, Engine};
use record::Record;
use tracing::debug;

impl Engine {
    /// Inserts `key` → `value` for `user`, carrying the opaque type tag.
    ///
    /// Rejected without side effects when `key` uses the reserved internal
    /// prefix or `user`'s token bucket is empty.
    pub fn put(&mut self, user: &[u8], key: &[u8], value: &[u8], type_info: u8) -> Result<()> {
        self.check_legal(key)?;
        self.take_token(user)?;

        self.apply(Record::with_type(key.to_vec(), value.to_vec(), type_info))
    }

    /// Logically deletes `key` for `user`: the current record gets its
    /// tombstone bit set and a fresh timestamp, then travels the ordinary
    /// write path so it shadows every older version.
    ///
    /// Returns `false` when there is no live record to delete.
    pub fn delete(&mut self, user: &[u8], key: &[u8]) -> Result<bool> {
        self.check_legal(key)?;
        self.take_token(user)?;

        let mut rec = match self.lookup(key)? {
            Some(rec) => rec,
            None => return Ok(false),
        };

        rec.mark_deleted();
        self.apply(rec)?;
        Ok(true)
    }

    /// The internal write path shared by puts, deletes, and recovery-free
    /// internal records.
    pub(crate) fn apply(&mut self, rec: Record) -> Result<()> {
        // Internal-prefix records are advisory bookkeeping and skip the WAL.
        if !self.is_internal(&rec.key) {
            self.wal.buffered_append(rec.clone())?;
        }

        self.cache.set(rec.clone());
        self.mem.add(rec);

        if self.mem.should_flush() {
            self.flush()?;
        }
        Ok(())
    }

    /// Streams the memtable into the next level-1 run, clears it, lets
    /// compaction cascade, then spills and truncates the WAL. A no-op on an
    /// empty memtable.
    pub fn flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }

        let run = (layout::last_run(&self.conf.path, &self.conf.db_name, 1)? + 1) as u32;
        debug!(
            run,
            entries = self.mem.count(),
            bytes = self.mem.usage(),
            "flushing memtable to level 1"
        );

        sstable::build(
            &self.conf.path,
            &self.conf.db_name,
            self.conf.summary_page_size,
            1,
            run,
            self.mem.iter(),
        )?;
        self.mem.clear();

        compaction::compact(&self.conf, 1)?;

        self.wal.flush_buffer()?;
        self.wal.delete_old()?;
        Ok(())
    }
}
