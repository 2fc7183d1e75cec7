//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the storage engine.
//!
//! Every public mutation is serialized into the [`record`] wire format and
//! appended to the WAL **before** the corresponding memtable update. On
//! restart the segments are replayed to reconstruct the memtable, so no
//! flushed append is lost.
//!
//! The log is split into numbered segment files (`<db>-<n>.log`), each
//! holding at most `max_recs_in_seg` records. Appends go through the
//! filesystem by growing the active segment and copying bytes in through a
//! memory map. A small in-memory buffer batches appends
//! ([`Wal::buffered_append`]) and spills to disk in whole-record chunks when
//! it fills or when [`Wal::flush_buffer`] is called — records sitting in the
//! buffer are the only writes a crash can lose.
//!
//! After a memtable flush persists the data elsewhere, [`Wal::delete_old`]
//! truncates the log: segments below the low-water mark are removed, the
//! survivors are renamed down to a contiguous 0-based numbering, and if
//! nothing survives a fresh empty segment 0 is created.

use memmap2::MmapMut;
use record::{CodecError, Record};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A segment contained a damaged or truncated record.
    #[error("corrupt segment: {0}")]
    Codec(#[from] CodecError),

    /// A read addressed a segment that does not exist.
    #[error("segment index {index} out of bounds ({count} segments)")]
    IndexOutOfBounds { index: usize, count: usize },

    /// `read_range` called with an empty or reversed range.
    #[error("invalid segment range {begin}..{end}")]
    InvalidRange { begin: usize, end: usize },

    /// Bad sizing parameters at construction.
    #[error("wal config: {0}")]
    BadParams(&'static str),
}

/// Checks WAL sizing parameters. Shared with the engine's config validation.
pub fn validate_params(
    max_recs_in_seg: usize,
    _lwm: usize,
    buffer_capacity: usize,
) -> Result<(), WalError> {
    if max_recs_in_seg == 0 {
        return Err(WalError::BadParams(
            "max_recs_in_seg must be a positive number",
        ));
    }
    if buffer_capacity == 0 {
        return Err(WalError::BadParams(
            "buffer_capacity must be a positive number",
        ));
    }
    Ok(())
}

/// Segmented write-ahead log for one database.
pub struct Wal {
    dir: PathBuf,
    db: String,

    /// Segment paths ordered by index; always at least one entry.
    segments: Vec<PathBuf>,
    /// Number of records in the active (last) segment.
    last_records: usize,

    max_recs_in_seg: usize,
    /// Low-water mark: on [`Wal::delete_old`], segments below this index go.
    lwm: usize,

    buffer: Vec<Record>,
    buffer_capacity: usize,
}

impl Wal {
    /// Opens the WAL in `dir` for database `db`, creating segment 0 if the
    /// directory holds no segments yet. Existing segments are adopted and
    /// the active segment's record count is recovered by scanning it.
    pub fn open(
        dir: &Path,
        db: &str,
        max_recs_in_seg: usize,
        lwm: usize,
        buffer_capacity: usize,
    ) -> Result<Self, WalError> {
        validate_params(max_recs_in_seg, lwm, buffer_capacity)?;

        let mut segments = layout::segment_paths(dir, db)?;
        if segments.is_empty() {
            let first = layout::log_path(dir, db, 0);
            File::create(&first)?;
            segments.push(first);
        }

        let last_records = count_records(segments.last().expect("at least one segment"))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            db: db.to_string(),
            segments,
            last_records,
            max_recs_in_seg,
            lwm,
            buffer: Vec::with_capacity(buffer_capacity),
            buffer_capacity,
        })
    }

    /// Number of segment files currently on disk.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of records waiting in the in-memory buffer.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends one record directly to the active segment, rolling over to a
    /// new segment first if the active one is full.
    pub fn append(&mut self, rec: &Record) -> Result<(), WalError> {
        if self.last_records == self.max_recs_in_seg {
            self.add_segment()?;
        }

        let mut bytes = Vec::with_capacity(rec.encoded_len() as usize);
        rec.write_to(&mut bytes)?;
        append_bytes(self.active(), &bytes)?;
        self.last_records += 1;
        Ok(())
    }

    /// Queues a record in the in-memory buffer; the buffer is spilled to
    /// disk once it reaches capacity. A record that is buffered but not yet
    /// flushed may be lost on crash.
    pub fn buffered_append(&mut self, rec: Record) -> Result<(), WalError> {
        self.buffer.push(rec);
        if self.buffer.len() == self.buffer_capacity {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Drains the buffer into segments, in whole-record chunks sized to the
    /// remaining capacity of the active segment.
    pub fn flush_buffer(&mut self) -> Result<(), WalError> {
        let mut start = 0;
        while start < self.buffer.len() {
            if self.last_records == self.max_recs_in_seg {
                self.add_segment()?;
            }

            let room = self.max_recs_in_seg - self.last_records;
            let take = room.min(self.buffer.len() - start);
            let chunk = &self.buffer[start..start + take];

            let mut bytes = Vec::new();
            for rec in chunk {
                rec.write_to(&mut bytes)?;
            }
            append_bytes(self.active(), &bytes)?;

            self.last_records += take;
            start += take;
        }
        self.buffer.clear();
        Ok(())
    }

    /// Reads every record from every segment, in log order.
    pub fn read_all(&self) -> Result<Vec<Record>, WalError> {
        let mut recs = Vec::new();
        for path in &self.segments {
            recs.extend(read_segment(path)?);
        }
        Ok(recs)
    }

    /// Reads every record from the active segment.
    pub fn read_last(&self) -> Result<Vec<Record>, WalError> {
        read_segment(self.active())
    }

    /// Reads every record from the segment at `index`.
    pub fn read_at(&self, index: usize) -> Result<Vec<Record>, WalError> {
        let path = self
            .segments
            .get(index)
            .ok_or(WalError::IndexOutOfBounds {
                index,
                count: self.segments.len(),
            })?;
        read_segment(path)
    }

    /// Reads every record from segments `begin..end` (end exclusive).
    pub fn read_range(&self, begin: usize, end: usize) -> Result<Vec<Record>, WalError> {
        if begin >= end {
            return Err(WalError::InvalidRange { begin, end });
        }
        if end > self.segments.len() {
            return Err(WalError::IndexOutOfBounds {
                index: end - 1,
                count: self.segments.len(),
            });
        }

        let mut recs = Vec::new();
        for path in &self.segments[begin..end] {
            recs.extend(read_segment(path)?);
        }
        Ok(recs)
    }

    /// Removes segments below the low-water mark and renames the survivors
    /// down to a contiguous 0-based numbering. If every segment is below
    /// the mark, a fresh empty segment 0 takes their place.
    ///
    /// Renames happen one file at a time, oldest first, so a crash midway
    /// leaves a recoverable superset of the log.
    pub fn delete_old(&mut self) -> Result<(), WalError> {
        if self.lwm == 0 {
            return Ok(());
        }

        let cut = self.lwm.min(self.segments.len());
        for path in &self.segments[..cut] {
            std::fs::remove_file(path)?;
        }
        debug!(removed = cut, db = %self.db, "truncated wal segments");
        let survivors = self.segments.split_off(cut);
        self.segments.clear();

        for (i, old_path) in survivors.into_iter().enumerate() {
            let new_path = layout::log_path(&self.dir, &self.db, i as u64);
            if old_path != new_path {
                std::fs::rename(&old_path, &new_path)?;
            }
            self.segments.push(new_path);
        }

        if self.segments.is_empty() {
            let first = layout::log_path(&self.dir, &self.db, 0);
            File::create(&first)?;
            self.segments.push(first);
        }

        self.last_records = count_records(self.active())?;
        Ok(())
    }

    /// Removes every segment and starts over with an empty segment 0.
    pub fn delete_all(&mut self) -> Result<(), WalError> {
        for path in &self.segments {
            std::fs::remove_file(path)?;
        }
        self.segments.clear();

        let first = layout::log_path(&self.dir, &self.db, 0);
        File::create(&first)?;
        self.segments.push(first);
        self.last_records = 0;
        Ok(())
    }

    /// Truncates the active segment to zero length.
    pub fn reset_last(&mut self) -> Result<(), WalError> {
        let file = OpenOptions::new().write(true).open(self.active())?;
        file.set_len(0)?;
        self.last_records = 0;
        Ok(())
    }

    fn active(&self) -> &Path {
        self.segments.last().expect("at least one segment")
    }

    fn add_segment(&mut self) -> Result<(), WalError> {
        let next_index = self.segments.len() as u64;
        let path = layout::log_path(&self.dir, &self.db, next_index);
        File::create(&path)?;
        debug!(index = next_index, db = %self.db, "opened new wal segment");
        self.segments.push(path);
        self.last_records = 0;
        Ok(())
    }
}

/// Grows the file by `bytes.len()` and copies the bytes in through a
/// memory map.
fn append_bytes(path: &Path, bytes: &[u8]) -> Result<(), WalError> {
    if bytes.is_empty() {
        return Ok(());
    }

    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let old_len = file.metadata()?.len();
    file.set_len(old_len + bytes.len() as u64)?;

    // Safe for the engine's single-owner model: nothing else maps or
    // resizes the active segment while this map is alive.
    let mut map = unsafe { MmapMut::map_mut(&file)? };
    map[old_len as usize..].copy_from_slice(bytes);
    map.flush()?;
    Ok(())
}

fn read_segment(path: &Path) -> Result<Vec<Record>, WalError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut recs = Vec::new();
    while let Some(rec) = Record::read_from(&mut reader)? {
        recs.push(rec);
    }
    Ok(recs)
}

fn count_records(path: &Path) -> Result<usize, WalError> {
    Ok(read_segment(path)?.len())
}
