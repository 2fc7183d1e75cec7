use super::helpers::test_config;
use crate::{Config, Engine, EngineError};
use tempfile::tempdir;

fn assert_bad_config(result: crate::Result<Engine>, needle: &str) {
    match result {
        Err(EngineError::BadConfig(msg)) => {
            assert!(msg.contains(needle), "message {:?} missing {:?}", msg, needle)
        }
        Err(other) => panic!("expected BadConfig, got {:?}", other),
        Ok(_) => panic!("expected BadConfig, engine started"),
    }
}

// -------------------- Validation --------------------

#[test]
fn skiplist_level_above_max_refuses_to_start() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.skiplist_level = 9;
    conf.skiplist_level_max = 5;
    assert_bad_config(Engine::open(conf), "skiplist");
}

#[test]
fn zero_capacities_refuse_to_start() {
    let dir = tempdir().unwrap();

    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 0;
    assert_bad_config(Engine::open(conf), "memtable");

    let mut conf = test_config(dir.path());
    conf.cache_capacity = 0;
    assert_bad_config(Engine::open(conf), "lru");

    let mut conf = test_config(dir.path());
    conf.summary_page_size = 0;
    assert_bad_config(Engine::open(conf), "summary_page_size");

    let mut conf = test_config(dir.path());
    conf.wal_buffer_capacity = 0;
    assert_bad_config(Engine::open(conf), "wal");

    let mut conf = test_config(dir.path());
    conf.token_bucket_tokens = 0;
    assert_bad_config(Engine::open(conf), "tokenbucket");
}

#[test]
fn empty_internal_prefix_refuses_to_start() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.internal_start = String::new();
    assert_bad_config(Engine::open(conf), "internal_start");
}

#[test]
fn threshold_strings_parse_by_powers_of_1024() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());

    conf.memtable_threshold = "512 B".to_string();
    assert_eq!(conf.memtable_threshold_bytes().unwrap(), 512);

    conf.memtable_threshold = "2 KB".to_string();
    assert_eq!(conf.memtable_threshold_bytes().unwrap(), 2048);

    conf.memtable_threshold = "3 MB".to_string();
    assert_eq!(conf.memtable_threshold_bytes().unwrap(), 3 * 1024 * 1024);

    conf.memtable_threshold = "1 GB".to_string();
    assert_eq!(conf.memtable_threshold_bytes().unwrap(), 1024 * 1024 * 1024);
}

#[test]
fn bad_threshold_strings_refuse_to_start() {
    let dir = tempdir().unwrap();

    for bad in ["2KBB", "KB 2", "2 TB", "two KB", "2", "2 KB extra"] {
        let mut conf = test_config(dir.path());
        conf.memtable_threshold = bad.to_string();
        assert_bad_config(Engine::open(conf), "threshold");
    }
}

#[test]
fn empty_flush_strategy_refuses_to_start() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.memtable_flush_strategy = 0;
    assert_bad_config(Engine::open(conf), "flush strategy");
}

// -------------------- File loading --------------------

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let conf = Config::load(&dir.path().join("nope.json")).unwrap();
    assert_eq!(conf.db_name, Config::default().db_name);
    assert_eq!(conf.memtable_capacity, Config::default().memtable_capacity);
}

#[test]
fn unparseable_config_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(
        Config::load(&path),
        Err(EngineError::BadConfig(_))
    ));
}

#[test]
fn invalid_values_in_config_file_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{"internal_start": ""}"#).unwrap();

    assert!(matches!(
        Config::load(&path),
        Err(EngineError::BadConfig(_))
    ));
}

#[test]
fn partial_config_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{"db_name": "custom", "cache_capacity": 17}"#).unwrap();

    let conf = Config::load(&path).unwrap();
    assert_eq!(conf.db_name, "custom");
    assert_eq!(conf.cache_capacity, 17);
    assert_eq!(conf.summary_page_size, Config::default().summary_page_size);
}

#[test]
fn dump_then_load_roundtrips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let mut conf = test_config(dir.path());
    conf.db_name = "dumped".to_string();
    conf.lsm_run_max = 7;
    conf.dump(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.db_name, "dumped");
    assert_eq!(loaded.lsm_run_max, 7);
    assert_eq!(loaded.wal_lwm_idx, conf.wal_lwm_idx);
}
