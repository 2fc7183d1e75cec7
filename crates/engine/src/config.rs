//! Engine configuration.
//!
//! All knobs live in one flat struct, loadable from a JSON file. A missing
//! file yields the defaults; a present but invalid file is a hard error —
//! the engine refuses to start on bad configuration rather than guessing.

use crate::bucket;
use crate::error::{EngineError, Result};
use memtable::MemtableOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for SSTable files.
    pub path: PathBuf,
    /// Directory for WAL segment files.
    pub wal_path: PathBuf,
    /// Database name, embedded in every filename.
    pub db_name: String,

    /// Starting skiplist height.
    pub skiplist_level: usize,
    /// Maximum skiplist height.
    pub skiplist_level_max: usize,
    /// Seed for the skiplist's coin-flip source.
    pub skiplist_seed: u64,

    /// Memtable record-count flush threshold.
    pub memtable_capacity: usize,
    /// Memtable byte-size flush threshold, as "<N> <unit>" with unit one of
    /// B, KB, MB, GB (powers of 1024).
    pub memtable_threshold: String,
    /// Bitmask of [`memtable::FLUSH_BY_CAPACITY`] and
    /// [`memtable::FLUSH_BY_THRESHOLD`].
    pub memtable_flush_strategy: u8,

    /// LRU cache capacity in records.
    pub cache_capacity: usize,

    /// Records per summary page.
    pub summary_page_size: usize,
    /// Levels beyond this never compact.
    pub lsm_lvl_max: u32,
    /// A level compacts once it holds this many runs.
    pub lsm_run_max: u32,

    /// Tokens granted per user per interval.
    pub token_bucket_tokens: i64,
    /// Bucket refill interval in seconds.
    pub token_bucket_interval: i64,

    /// Records per WAL segment.
    pub wal_max_recs_in_seg: usize,
    /// Low-water mark: segments below this index are dropped after a flush.
    pub wal_lwm_idx: usize,
    /// In-memory WAL buffer capacity in records.
    pub wal_buffer_capacity: usize,

    /// Reserved key prefix for engine metadata. Must be non-empty.
    pub internal_start: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
            wal_path: PathBuf::from("data/log"),
            db_name: "silt".to_string(),
            skiplist_level: 3,
            skiplist_level_max: 5,
            skiplist_seed: 0x517f,
            memtable_capacity: 10,
            memtable_threshold: "2 KB".to_string(),
            memtable_flush_strategy: memtable::FLUSH_BY_CAPACITY | memtable::FLUSH_BY_THRESHOLD,
            cache_capacity: 5,
            summary_page_size: 3,
            lsm_lvl_max: 4,
            lsm_run_max: 4,
            token_bucket_tokens: 100,
            token_bucket_interval: 1,
            wal_max_recs_in_seg: 5,
            wal_lwm_idx: 2,
            wal_buffer_capacity: 5,
            internal_start: "$".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from a JSON file. A missing file yields the
    /// defaults; an unreadable or invalid one is [`EngineError::BadConfig`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let conf: Config = serde_json::from_str(&data)
            .map_err(|e| EngineError::BadConfig(format!("{}: {}", path.display(), e)))?;
        conf.validate()?;
        Ok(conf)
    }

    /// Writes the effective configuration to `path` as pretty JSON.
    pub fn dump(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::BadConfig(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Checks every parameter; the engine refuses to start on any failure.
    pub fn validate(&self) -> Result<()> {
        skiplist::validate_params(self.skiplist_level, self.skiplist_level_max)
            .map_err(|e| EngineError::BadConfig(format!("skiplist config: {}", e)))?;

        if self.memtable_capacity == 0 {
            return Err(EngineError::BadConfig(
                "memtable config: capacity must be a positive number".to_string(),
            ));
        }
        self.memtable_threshold_bytes()?;
        if self.memtable_flush_strategy
            & (memtable::FLUSH_BY_CAPACITY | memtable::FLUSH_BY_THRESHOLD)
            == 0
        {
            return Err(EngineError::BadConfig(
                "memtable config: flush strategy enables neither capacity nor threshold"
                    .to_string(),
            ));
        }

        cache::validate_params(self.cache_capacity)
            .map_err(|e| EngineError::BadConfig(format!("lru config: {}", e)))?;

        if self.summary_page_size == 0 {
            return Err(EngineError::BadConfig(
                "lsm config: summary_page_size must be a positive number".to_string(),
            ));
        }
        if self.lsm_lvl_max == 0 || self.lsm_run_max == 0 {
            return Err(EngineError::BadConfig(
                "lsm config: lsm_lvl_max and lsm_run_max must be positive numbers".to_string(),
            ));
        }

        bucket::validate_params(self.token_bucket_tokens, self.token_bucket_interval)?;

        wal::validate_params(
            self.wal_max_recs_in_seg,
            self.wal_lwm_idx,
            self.wal_buffer_capacity,
        )
        .map_err(|e| EngineError::BadConfig(format!("wal config: {}", e)))?;

        if self.internal_start.is_empty() {
            return Err(EngineError::BadConfig(
                "internal_start cannot be an empty string".to_string(),
            ));
        }

        Ok(())
    }

    /// Parses `memtable_threshold` ("<N> <unit>") into bytes.
    pub fn memtable_threshold_bytes(&self) -> Result<u64> {
        let bad = || {
            EngineError::BadConfig(format!(
                "memtable config: cannot parse threshold {:?} (expected \"<N> <unit>\" with unit B, KB, MB or GB)",
                self.memtable_threshold
            ))
        };

        let mut parts = self.memtable_threshold.split_whitespace();
        let amount: u64 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let unit = parts.next().ok_or_else(bad)?;
        if parts.next().is_some() {
            return Err(bad());
        }

        let exponent = match unit {
            "B" => 0u32,
            "KB" => 1,
            "MB" => 2,
            "GB" => 3,
            _ => return Err(bad()),
        };

        Ok(amount * 1024u64.pow(exponent))
    }

    /// Assembles the memtable's options from the relevant knobs.
    pub(crate) fn memtable_options(&self) -> Result<MemtableOptions> {
        Ok(MemtableOptions {
            skiplist_level: self.skiplist_level,
            skiplist_level_max: self.skiplist_level_max,
            skiplist_seed: self.skiplist_seed,
            capacity: self.memtable_capacity,
            threshold_bytes: self.memtable_threshold_bytes()?,
            flush_strategy: self.memtable_flush_strategy,
        })
    }
}
