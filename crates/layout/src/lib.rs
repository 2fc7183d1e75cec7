//! # Filesystem layout
//!
//! The directory *is* the manifest: every on-disk structure is identified
//! entirely by its filename, and engine state (last level, last run, WAL
//! segments) is recovered by scanning directories and parsing names.
//!
//! ```text
//! <db>-<level>-<run>-<kind>.db     SSTable file, kind ∈ {data, filter,
//!                                  index, summary, metadata}, level ≥ 1
//! <db>-<n>.log                     WAL segment, n ≥ 0
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// The five sibling files that make up one SSTable run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableKind {
    Data,
    Filter,
    Index,
    Summary,
    Metadata,
}

impl TableKind {
    /// All kinds, in the order a run is built.
    pub const ALL: [TableKind; 5] = [
        TableKind::Data,
        TableKind::Index,
        TableKind::Summary,
        TableKind::Filter,
        TableKind::Metadata,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Data => "data",
            TableKind::Filter => "filter",
            TableKind::Index => "index",
            TableKind::Summary => "summary",
            TableKind::Metadata => "metadata",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "data" => Some(TableKind::Data),
            "filter" => Some(TableKind::Filter),
            "index" => Some(TableKind::Index),
            "summary" => Some(TableKind::Summary),
            "metadata" => Some(TableKind::Metadata),
            _ => None,
        }
    }
}

/// A filename understood by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    Table {
        db: String,
        level: u32,
        run: u32,
        kind: TableKind,
    },
    Log {
        db: String,
        index: u64,
    },
}

/// Builds the path of one SSTable file.
///
/// # Panics
///
/// Panics if `level` is 0 — level 0 is never materialized on disk.
#[must_use]
pub fn table_path(dir: &Path, db: &str, level: u32, run: u32, kind: TableKind) -> PathBuf {
    assert!(level >= 1, "table level must be >= 1");
    dir.join(format!("{}-{}-{}-{}.db", db, level, run, kind.as_str()))
}

/// Builds the path of one WAL segment file.
#[must_use]
pub fn log_path(dir: &Path, db: &str, index: u64) -> PathBuf {
    dir.join(format!("{}-{}.log", db, index))
}

/// Parses a filename (not a path) back into its components. Returns `None`
/// for files the engine does not own.
#[must_use]
pub fn parse(file_name: &str) -> Option<ParsedName> {
    let (stem, ext) = file_name.rsplit_once('.')?;

    match ext {
        "db" => {
            // <db>-<level>-<run>-<kind>; db may itself contain dashes.
            let (rest, kind_str) = stem.rsplit_once('-')?;
            let kind = TableKind::from_str(kind_str)?;
            let (rest, run_str) = rest.rsplit_once('-')?;
            let run = run_str.parse().ok()?;
            let (db, level_str) = rest.rsplit_once('-')?;
            let level = level_str.parse().ok()?;
            if level == 0 || db.is_empty() {
                return None;
            }
            Some(ParsedName::Table {
                db: db.to_string(),
                level,
                run,
                kind,
            })
        }
        "log" => {
            let (db, index_str) = stem.rsplit_once('-')?;
            let index = index_str.parse().ok()?;
            if db.is_empty() {
                return None;
            }
            Some(ParsedName::Log {
                db: db.to_string(),
                index,
            })
        }
        _ => None,
    }
}

/// Greatest SSTable level present in `dir` for `db`, or −1 if none.
pub fn last_level(dir: &Path, db: &str) -> io::Result<i64> {
    let mut level = -1;
    for name in dir_names(dir)? {
        if let Some(ParsedName::Table {
            db: got, level: l, ..
        }) = parse(&name)
        {
            if got == db {
                level = level.max(i64::from(l));
            }
        }
    }
    Ok(level)
}

/// Greatest run index on `level` for `db`, or −1 if the level is empty.
pub fn last_run(dir: &Path, db: &str, level: u32) -> io::Result<i64> {
    let mut run = -1;
    for name in dir_names(dir)? {
        if let Some(ParsedName::Table {
            db: got,
            level: l,
            run: r,
            ..
        }) = parse(&name)
        {
            if got == db && l == level {
                run = run.max(i64::from(r));
            }
        }
    }
    Ok(run)
}

/// Greatest WAL segment index for `db`, or −1 if none.
pub fn last_log(dir: &Path, db: &str) -> io::Result<i64> {
    let mut index = -1;
    for name in dir_names(dir)? {
        if let Some(ParsedName::Log { db: got, index: n }) = parse(&name) {
            if got == db {
                index = index.max(n as i64);
            }
        }
    }
    Ok(index)
}

/// All WAL segment paths for `db`, ordered by segment index.
pub fn segment_paths(dir: &Path, db: &str) -> io::Result<Vec<PathBuf>> {
    let mut indexed: Vec<(u64, PathBuf)> = Vec::new();
    for name in dir_names(dir)? {
        if let Some(ParsedName::Log { db: got, index }) = parse(&name) {
            if got == db {
                indexed.push((index, dir.join(&name)));
            }
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}

/// Groups every SSTable file for `db` by (level, run). Used on startup to
/// find and discard runs that are missing one of their five siblings.
pub fn run_groups(dir: &Path, db: &str) -> io::Result<BTreeMap<(u32, u32), Vec<TableKind>>> {
    let mut groups: BTreeMap<(u32, u32), Vec<TableKind>> = BTreeMap::new();
    for name in dir_names(dir)? {
        if let Some(ParsedName::Table {
            db: got,
            level,
            run,
            kind,
        }) = parse(&name)
        {
            if got == db {
                groups.entry((level, run)).or_default().push(kind);
            }
        }
    }
    Ok(groups)
}

fn dir_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests;
