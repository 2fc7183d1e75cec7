//! Wire structures shared by the index and summary files.
//!
//! Both files are sequences of the same entry shape; they differ only in
//! what the offset points at (index → data file, summary → index file) and
//! in the summary's leading header.

use crate::TableError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Keys larger than this are treated as corruption when decoding entries.
const MAX_KEY_BYTES: u64 = 64 * 1024;

/// One index-file entry: `key_size u64 | offset i64 | key`.
///
/// `offset` is the byte position of the record with `key` in the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset: i64,
    pub key: Vec<u8>,
}

/// One summary-file entry. Same wire shape as [`IndexEntry`], but `offset`
/// is the byte position of an entry in the *index* file.
pub type SummaryEntry = IndexEntry;

impl IndexEntry {
    /// Bytes this entry occupies on disk.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        8 + 8 + self.key.len() as u64
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.key.len() as u64)?;
        w.write_i64::<LittleEndian>(self.offset)?;
        w.write_all(&self.key)?;
        Ok(())
    }

    /// Reads one entry; `Ok(None)` on a clean EOF at an entry boundary.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Self>, TableError> {
        let mut head = [0u8; 16];
        let mut filled = 0usize;
        while filled < head.len() {
            let n = r.read(&mut head[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < head.len() {
            return Err(TableError::Truncated("entry header"));
        }

        let mut h = &head[..];
        let key_size = h.read_u64::<LittleEndian>()?;
        let offset = h.read_i64::<LittleEndian>()?;
        if key_size > MAX_KEY_BYTES {
            return Err(TableError::Truncated("entry key size"));
        }

        let mut key = vec![0u8; key_size as usize];
        r.read_exact(&mut key)
            .map_err(|_| TableError::Truncated("entry key"))?;

        Ok(Some(Self { offset, key }))
    }
}

/// The summary file's header:
/// `min_key_size u64 | max_key_size u64 | payload u64 | min_key | max_key`.
///
/// `payload` is the total byte length of the entry array that follows, so a
/// reader can buffer the whole summary without probing for EOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryHeader {
    pub min_key: Vec<u8>,
    pub max_key: Vec<u8>,
    pub payload: u64,
}

impl SummaryHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.min_key.len() as u64)?;
        w.write_u64::<LittleEndian>(self.max_key.len() as u64)?;
        w.write_u64::<LittleEndian>(self.payload)?;
        w.write_all(&self.min_key)?;
        w.write_all(&self.max_key)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, TableError> {
        let min_key_size = r
            .read_u64::<LittleEndian>()
            .map_err(|_| TableError::Truncated("summary header"))?;
        let max_key_size = r
            .read_u64::<LittleEndian>()
            .map_err(|_| TableError::Truncated("summary header"))?;
        let payload = r
            .read_u64::<LittleEndian>()
            .map_err(|_| TableError::Truncated("summary header"))?;
        if min_key_size > MAX_KEY_BYTES || max_key_size > MAX_KEY_BYTES {
            return Err(TableError::Truncated("summary key size"));
        }

        let mut min_key = vec![0u8; min_key_size as usize];
        let mut max_key = vec![0u8; max_key_size as usize];
        r.read_exact(&mut min_key)
            .map_err(|_| TableError::Truncated("summary min key"))?;
        r.read_exact(&mut max_key)
            .map_err(|_| TableError::Truncated("summary max key"))?;

        Ok(Self {
            min_key,
            max_key,
            payload,
        })
    }
}
