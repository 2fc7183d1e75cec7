//! Leveled compaction: fold a full level into the next one.
//!
//! A level is full once it holds `lsm_run_max` runs. Compaction k-way
//! merges the data files of every run on the level — newest version of
//! each key wins, tombstones preserved — streams the result into the first
//! free run of the next level, builds that run's secondary files, deletes
//! all input groups, and then gives the next level the same chance.

use crate::config::Config;
use crate::error::Result;
use layout::TableKind;
use sstable::{MergeIterator, RunBuilder};
use std::path::PathBuf;
use tracing::debug;

/// True when `level` is eligible and due: level 0 never compacts, levels at
/// or beyond `lsm_lvl_max` never compact, and a level is due once its last
/// run index reaches `lsm_run_max - 1`.
pub(crate) fn needs_compaction(conf: &Config, level: u32) -> Result<bool> {
    if level == 0 || level >= conf.lsm_lvl_max {
        return Ok(false);
    }
    let last_run = layout::last_run(&conf.path, &conf.db_name, level)?;
    Ok(last_run >= i64::from(conf.lsm_run_max) - 1)
}

/// Compacts `level` into `level + 1` if it is due, then recurses on the
/// next level (which the new run may itself have filled).
pub(crate) fn compact(conf: &Config, level: u32) -> Result<()> {
    if !needs_compaction(conf, level)? {
        return Ok(());
    }

    let last_run = layout::last_run(&conf.path, &conf.db_name, level)?;
    let inputs: Vec<PathBuf> = (0..=last_run)
        .map(|r| layout::table_path(&conf.path, &conf.db_name, level, r as u32, TableKind::Data))
        .collect();

    let out_level = level + 1;
    let out_run = (layout::last_run(&conf.path, &conf.db_name, out_level)? + 1) as u32;
    debug!(
        level,
        inputs = inputs.len(),
        out_level,
        out_run,
        "compacting level"
    );

    let mut merge = MergeIterator::open(&inputs)?;
    let mut builder = RunBuilder::create(
        &conf.path,
        &conf.db_name,
        conf.summary_page_size,
        out_level,
        out_run,
    )?;
    while let Some(rec) = merge.next_record()? {
        builder.add(&rec)?;
    }
    builder.finish()?;

    // Release the input handles, then remove every input group whole —
    // all five siblings together.
    drop(merge);
    for run in 0..=last_run {
        for kind in TableKind::ALL {
            let path = layout::table_path(&conf.path, &conf.db_name, level, run as u32, kind);
            std::fs::remove_file(path)?;
        }
    }

    compact(conf, out_level)
}
