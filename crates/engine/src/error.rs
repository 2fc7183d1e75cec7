//! The engine's error taxonomy.
//!
//! Leaf crates carry their own typed errors; everything converts into
//! [`EngineError`] at the engine boundary. Two variants are *rejections*
//! rather than failures: [`EngineError::IllegalKey`] and
//! [`EngineError::RateLimited`] are returned without side effects and the
//! engine remains fully usable afterwards.

use cache::CacheError;
use memtable::MemtableError;
use sstable::TableError;
use thiserror::Error;
use wal::WalError;

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The key starts with the reserved internal prefix. Non-fatal.
    #[error("illegal key: starts with the reserved internal prefix")]
    IllegalKey,

    /// The caller's token bucket is empty. Non-fatal.
    #[error("rate limited: {retry_in_secs} seconds until the bucket refills")]
    RateLimited { retry_in_secs: i64 },

    /// Invalid configuration; the engine refuses to start.
    #[error("bad config: {0}")]
    BadConfig(String),

    #[error("wal: {0}")]
    Wal(#[from] WalError),

    #[error("sstable: {0}")]
    Table(#[from] TableError),

    #[error("memtable: {0}")]
    Memtable(#[from] MemtableError),

    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True for the non-fatal rejection variants.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::IllegalKey | EngineError::RateLimited { .. }
        )
    }
}
