//! Point lookups against one run: filter → summary → index → data.

use crate::format::{IndexEntry, SummaryHeader};
use crate::TableError;
use bloom::BloomFilter;
use layout::TableKind;
use record::Record;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read handle for one (level, run) coordinate. Holds no open files; each
/// lookup opens and seeks exactly the files the cascade reaches.
pub struct TableReader {
    dir: PathBuf,
    db: String,
    level: u32,
    run: u32,
}

impl TableReader {
    #[must_use]
    pub fn new(dir: &Path, db: &str, level: u32, run: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            db: db.to_string(),
            level,
            run,
        }
    }

    /// Looks up `key` in this run.
    ///
    /// Returns the stored record — possibly a tombstone, which callers must
    /// interpret — or `None` when the run provably does not contain the
    /// key. Errors if the run is incomplete or any file is damaged.
    pub fn get(&self, key: &[u8]) -> Result<Option<Record>, TableError> {
        self.check_complete()?;

        // 1. Filter: a negative answer is definitive.
        if !self.filter_may_contain(key)? {
            return Ok(None);
        }

        // 2. Summary: narrow to one index page.
        let index_offset = match self.summary_offset(key)? {
            Some(off) => off,
            None => return Ok(None),
        };

        // 3. Index: scan forward within the page for the exact key.
        let data_offset = match self.index_offset(key, index_offset)? {
            Some(off) => off,
            None => return Ok(None),
        };

        // 4. Data: decode the one record.
        self.read_record(key, data_offset).map(Some)
    }

    /// The engine refuses to read a run that is missing any sibling — a
    /// partial group is the footprint of an interrupted build.
    fn check_complete(&self) -> Result<(), TableError> {
        for kind in TableKind::ALL {
            if !self.path(kind).exists() {
                return Err(TableError::MissingSibling {
                    level: self.level,
                    run: self.run,
                    kind,
                });
            }
        }
        Ok(())
    }

    fn filter_may_contain(&self, key: &[u8]) -> Result<bool, TableError> {
        let mut r = BufReader::new(File::open(self.path(TableKind::Filter))?);
        let bf = BloomFilter::read_from(&mut r)?;
        Ok(bf.may_contain(key))
    }

    /// Scans the summary for the greatest entry whose key ≤ `key` and
    /// returns its index-file offset. `None` when `key` falls outside the
    /// run's [min, max] range or before the first summary entry.
    fn summary_offset(&self, key: &[u8]) -> Result<Option<i64>, TableError> {
        let mut r = BufReader::new(File::open(self.path(TableKind::Summary))?);
        let header = SummaryHeader::read_from(&mut r)?;

        if key < header.min_key.as_slice() || key > header.max_key.as_slice() {
            return Ok(None);
        }

        let mut best: Option<i64> = None;
        while let Some(entry) = IndexEntry::read_from(&mut r)? {
            if entry.key.as_slice() > key {
                break;
            }
            best = Some(entry.offset);
        }
        Ok(best)
    }

    /// Linear forward scan of the index from `start_offset`. Stops at the
    /// first entry whose key exceeds `key`.
    fn index_offset(&self, key: &[u8], start_offset: i64) -> Result<Option<i64>, TableError> {
        let mut f = File::open(self.path(TableKind::Index))?;
        f.seek(SeekFrom::Start(start_offset as u64))?;
        let mut r = BufReader::new(f);

        while let Some(entry) = IndexEntry::read_from(&mut r)? {
            if entry.key.as_slice() == key {
                return Ok(Some(entry.offset));
            }
            if entry.key.as_slice() > key {
                break;
            }
        }
        Ok(None)
    }

    fn read_record(&self, key: &[u8], offset: i64) -> Result<Record, TableError> {
        let mut f = File::open(self.path(TableKind::Data))?;
        f.seek(SeekFrom::Start(offset as u64))?;
        let mut r = BufReader::new(f);

        let rec = Record::read_from(&mut r)?.ok_or(TableError::Truncated("data record"))?;
        if rec.key != key {
            return Err(TableError::IndexMismatch);
        }
        Ok(rec)
    }

    fn path(&self, kind: TableKind) -> PathBuf {
        layout::table_path(&self.dir, &self.db, self.level, self.run, kind)
    }
}
