//! # SSTable — Sorted String Table
//!
//! Immutable on-disk storage for the engine. When the memtable fills, its
//! contents are written out as one *run*: five sibling files at a given
//! (level, run) coordinate, named by [`layout`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ data      record stream in key-ascending order ([`record`])   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ index     key_size u64 | offset i64 | key                     │
//! │           offset = byte position of the record in `data`      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ summary   header: min/max key sizes, payload bytes, min key,  │
//! │           max key — then sparse index entries: one for the    │
//! │           first record, every page-size records after it,     │
//! │           and the last record; offsets point into `index`     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ filter    serialized [`bloom::BloomFilter`] over the keys     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ metadata  [`merkle::MerkleTree`] over the record values       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once written the five files are never modified, only deleted together
//! when compaction folds the run into the next level. A run missing any
//! sibling is unreadable and gets discarded at startup.
//!
//! Point lookups cascade filter → summary → index → data
//! ([`TableReader::get`]), so a negative filter answer costs one small file
//! read and a positive lookup touches at most one summary page, one index
//! page, and one record.

mod builder;
mod format;
mod merge;
mod reader;

pub use builder::{build, RunBuilder, FILTER_FP_RATE};
pub use format::{IndexEntry, SummaryEntry, SummaryHeader};
pub use merge::MergeIterator;
pub use reader::TableReader;

use layout::TableKind;
use thiserror::Error;

/// Errors from building or reading SSTable runs.
#[derive(Debug, Error)]
pub enum TableError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A damaged record in a data file.
    #[error("corrupt data file: {0}")]
    Codec(#[from] record::CodecError),

    /// A damaged metadata (merkle) file.
    #[error("corrupt metadata file: {0}")]
    Merkle(#[from] merkle::MerkleError),

    /// An index, summary, or data file ended mid-structure.
    #[error("corrupt table file: truncated {0}")]
    Truncated(&'static str),

    /// The index pointed at a record whose key does not match.
    #[error("index points at mismatching key in data file")]
    IndexMismatch,

    /// A run is missing one of its five sibling files.
    #[error("run {level}-{run} is missing its {} file", .kind.as_str())]
    MissingSibling {
        level: u32,
        run: u32,
        kind: TableKind,
    },

    /// A run was built from zero records.
    #[error("refusing to build an empty table")]
    Empty,
}

#[cfg(test)]
mod tests;
