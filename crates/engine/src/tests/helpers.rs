use crate::{Config, Engine};
use layout::TableKind;
use record::Record;
use std::io::BufReader;
use std::path::Path;

pub(crate) const USER: &[u8] = b"tester";

/// A config rooted in a temp directory, sized so nothing flushes or rate
/// limits unless a test lowers the knobs on purpose.
pub(crate) fn test_config(root: &Path) -> Config {
    Config {
        path: root.join("data"),
        wal_path: root.join("log"),
        db_name: "testdb".to_string(),
        memtable_capacity: 100_000,
        memtable_threshold: "64 MB".to_string(),
        memtable_flush_strategy: memtable::FLUSH_BY_CAPACITY,
        token_bucket_tokens: 1_000_000,
        token_bucket_interval: 3600,
        ..Config::default()
    }
}

pub(crate) fn open(conf: &Config) -> Engine {
    Engine::open(conf.clone()).unwrap()
}

/// Reads the whole data file of one run.
pub(crate) fn data_records(conf: &Config, level: u32, run: u32) -> Vec<Record> {
    let path = layout::table_path(&conf.path, &conf.db_name, level, run, TableKind::Data);
    let mut r = BufReader::new(std::fs::File::open(path).unwrap());
    let mut out = Vec::new();
    while let Some(rec) = Record::read_from(&mut r).unwrap() {
        out.push(rec);
    }
    out
}

/// Number of complete runs present on `level`.
pub(crate) fn runs_on_level(conf: &Config, level: u32) -> i64 {
    layout::last_run(&conf.path, &conf.db_name, level).unwrap() + 1
}
