//! # Record — the atomic unit of storage
//!
//! Every byte the engine writes — WAL segments, SSTable data files — is a
//! sequence of records in a single framed binary format.
//!
//! ## Binary format (all integers little-endian)
//!
//! ```text
//! [crc32: u32][timestamp: i64][status: u8][type_info: u8]
//! [key_len: u64][val_len: u64][key bytes][value bytes]
//! ```
//!
//! The CRC32 (IEEE) covers the key bytes concatenated with the value bytes,
//! nothing else. A mismatch on read means the file is damaged and the read
//! fails with [`CodecError::Checksum`].
//!
//! `status` bit 0 is the tombstone: a logically deleted record stays in the
//! file (and in the memtable) until compaction merges it away. `type_info`
//! is an opaque tag for higher layers; the engine never interprets it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use record::Record;
//!
//! let rec = Record::new(b"hello".to_vec(), b"world".to_vec());
//! let mut buf = Vec::new();
//! rec.write_to(&mut buf).unwrap();
//! let back = Record::read_from(&mut buf.as_slice()).unwrap().unwrap();
//! assert_eq!(back, rec);
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Tombstone bit in [`Record::status`]. Remaining bits are reserved.
pub const STATUS_TOMBSTONE: u8 = 1 << 0;

/// Fixed per-record header size: crc + timestamp + status + type_info +
/// key_len + val_len.
pub const HEADER_BYTES: u64 = 4 + 8 + 1 + 1 + 8 + 8;

/// Maximum key size accepted when decoding (64 KiB). Declared sizes beyond
/// this are treated as corruption rather than allocated.
const MAX_KEY_BYTES: u64 = 64 * 1024;
/// Maximum value size accepted when decoding (64 MiB).
const MAX_VALUE_BYTES: u64 = 64 * 1024 * 1024;

/// Errors produced while encoding or decoding records.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The stored CRC32 does not match the recomputed one.
    #[error("record checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    Checksum { expected: u32, actual: u32 },

    /// The stream ended in the middle of a record.
    #[error("truncated record")]
    Truncated,
}

/// The atomic key-value unit written, logged, and read by the engine.
///
/// `crc` is maintained by the constructors; code that mutates `key` or
/// `value` directly must call [`Record::reseal`] before serializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// CRC32 (IEEE) of `key ‖ value`.
    pub crc: u32,
    /// Creation time, seconds since the Unix epoch. Conflict tie-breaker.
    pub timestamp: i64,
    /// Status bits; see [`STATUS_TOMBSTONE`].
    pub status: u8,
    /// Opaque 8-bit tag carried through for higher layers.
    pub type_info: u8,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Minimal context kept per record while an SSTable is under construction:
/// the key and the encoded size of the record it came from. Enough to build
/// the index, summary, and filter without re-reading the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContext {
    pub key: Vec<u8>,
    pub rec_size: u64,
}

impl Record {
    /// Creates a live record with the current timestamp and no type tag.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        let crc = checksum(&key, &value);
        Self {
            crc,
            timestamp: unix_now(),
            status: 0,
            type_info: 0,
            key,
            value,
        }
    }

    /// Like [`Record::new`] but with an explicit type tag.
    pub fn with_type(key: Vec<u8>, value: Vec<u8>, type_info: u8) -> Self {
        let mut rec = Self::new(key, value);
        rec.type_info = type_info;
        rec
    }

    /// Exact number of bytes [`Record::write_to`] produces.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        HEADER_BYTES + self.key.len() as u64 + self.value.len() as u64
    }

    /// Returns `true` if the tombstone bit is set.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status & STATUS_TOMBSTONE != 0
    }

    /// Sets the tombstone bit and refreshes the timestamp so the deletion
    /// shadows the record it replaces.
    pub fn mark_deleted(&mut self) {
        self.status |= STATUS_TOMBSTONE;
        self.timestamp = unix_now();
    }

    /// Recomputes the CRC after direct mutation of `key` or `value`.
    pub fn reseal(&mut self) {
        self.crc = checksum(&self.key, &self.value);
    }

    /// Derives the [`KeyContext`] for this record.
    #[must_use]
    pub fn key_context(&self) -> KeyContext {
        KeyContext {
            key: self.key.clone(),
            rec_size: self.encoded_len(),
        }
    }

    /// Appends the record to `w` in the on-disk format.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.crc)?;
        w.write_i64::<LittleEndian>(self.timestamp)?;
        w.write_u8(self.status)?;
        w.write_u8(self.type_info)?;
        w.write_u64::<LittleEndian>(self.key.len() as u64)?;
        w.write_u64::<LittleEndian>(self.value.len() as u64)?;
        w.write_all(&self.key)?;
        w.write_all(&self.value)?;
        Ok(())
    }

    /// Reads one record from `r`.
    ///
    /// # Termination
    ///
    /// - **Clean EOF** (zero bytes before the header) → `Ok(None)`; this is
    ///   the normal end of a record stream.
    /// - **Mid-record EOF** → [`CodecError::Truncated`].
    /// - **CRC mismatch** → [`CodecError::Checksum`].
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Record>, CodecError> {
        let mut header = [0u8; HEADER_BYTES as usize];
        let mut filled = 0usize;
        while filled < header.len() {
            let n = r.read(&mut header[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < header.len() {
            return Err(CodecError::Truncated);
        }

        let mut h = &header[..];
        let crc = h.read_u32::<LittleEndian>()?;
        let timestamp = h.read_i64::<LittleEndian>()?;
        let status = h.read_u8()?;
        let type_info = h.read_u8()?;
        let key_len = h.read_u64::<LittleEndian>()?;
        let val_len = h.read_u64::<LittleEndian>()?;

        // Reject absurd declared sizes before allocating.
        if key_len > MAX_KEY_BYTES || val_len > MAX_VALUE_BYTES {
            return Err(CodecError::Truncated);
        }

        let mut key = vec![0u8; key_len as usize];
        let mut value = vec![0u8; val_len as usize];
        read_exact_or_truncated(r, &mut key)?;
        read_exact_or_truncated(r, &mut value)?;

        let actual = checksum(&key, &value);
        if actual != crc {
            return Err(CodecError::Checksum {
                expected: crc,
                actual,
            });
        }

        Ok(Some(Record {
            crc,
            timestamp,
            status,
            type_info,
            key,
            value,
        }))
    }
}

fn read_exact_or_truncated<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), CodecError> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CodecError::Truncated),
        Err(e) => Err(CodecError::Io(e)),
    }
}

/// CRC32 (IEEE) over `key ‖ value`.
#[must_use]
pub fn checksum(key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
