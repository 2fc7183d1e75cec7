//! Cold-start recovery: incomplete-run cleanup and WAL replay.

use crate::error::Result;
use layout::TableKind;
use memtable::Memtable;
use std::path::Path;
use tracing::debug;
use wal::Wal;

/// Deletes every SSTable run in `dir` that is missing one of its five
/// sibling files. A partial group can only be the leftover of a build that
/// a crash interrupted; its data is still recoverable from the WAL.
pub(crate) fn discard_incomplete_runs(dir: &Path, db: &str) -> Result<()> {
    for ((level, run), kinds) in layout::run_groups(dir, db)? {
        if TableKind::ALL.iter().all(|k| kinds.contains(k)) {
            continue;
        }

        debug!(level, run, present = kinds.len(), "discarding incomplete run");
        for kind in TableKind::ALL {
            let path = layout::table_path(dir, db, level, run, kind);
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}

/// Replays every WAL record into the memtable, in log order. Later records
/// overwrite earlier ones key by key, tombstones included, so the memtable
/// ends up exactly as it was after the last flushed append.
pub(crate) fn replay_wal(wal: &Wal, mem: &mut Memtable) -> Result<usize> {
    let records = wal.read_all()?;
    let count = records.len();
    for rec in records {
        mem.add(rec);
    }
    Ok(count)
}
