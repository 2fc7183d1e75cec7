use super::helpers::*;
use layout::TableKind;
use tempfile::tempdir;

// -------------------- Level-full trigger --------------------

#[test]
fn level_one_compacts_when_run_max_is_reached() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    conf.lsm_run_max = 2;
    let mut engine = open(&conf);

    engine.put(USER, b"a", b"1", 0).unwrap();
    engine.put(USER, b"b", b"1", 0).unwrap(); // flush -> L1R0
    assert_eq!(runs_on_level(&conf, 1), 1);

    engine.put(USER, b"a", b"2", 0).unwrap();
    engine.put(USER, b"c", b"1", 0).unwrap(); // flush -> L1R1 -> compact

    // Level 1 was folded whole into a single run on level 2.
    assert_eq!(runs_on_level(&conf, 1), 0);
    assert_eq!(runs_on_level(&conf, 2), 1);

    // Conflict resolution kept the newer a=2; exactly three records remain.
    let merged = data_records(&conf, 2, 0);
    let kv: Vec<(&[u8], &[u8])> = merged
        .iter()
        .map(|r| (r.key.as_slice(), r.value.as_slice()))
        .collect();
    assert_eq!(
        kv,
        vec![
            (b"a".as_slice(), b"2".as_slice()),
            (b"b".as_slice(), b"1".as_slice()),
            (b"c".as_slice(), b"1".as_slice()),
        ]
    );

    // Reads resolve through the new level.
    assert_eq!(engine.get(USER, b"a").unwrap().unwrap().value, b"2");
    assert_eq!(engine.get(USER, b"b").unwrap().unwrap().value, b"1");
}

#[test]
fn input_groups_are_deleted_whole() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    conf.lsm_run_max = 2;
    let mut engine = open(&conf);

    for i in 0..4u32 {
        engine
            .put(USER, format!("k{}", i).as_bytes(), b"v", 0)
            .unwrap();
    }

    for run in 0..2 {
        for kind in TableKind::ALL {
            assert!(
                !layout::table_path(&conf.path, &conf.db_name, 1, run, kind).exists(),
                "level-1 run {} {} should be gone",
                run,
                kind.as_str()
            );
        }
    }
    for kind in TableKind::ALL {
        assert!(layout::table_path(&conf.path, &conf.db_name, 2, 0, kind).exists());
    }
}

#[test]
fn tombstones_survive_compaction() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    conf.lsm_run_max = 2;
    let mut engine = open(&conf);

    engine.put(USER, b"a", b"1", 0).unwrap();
    engine.put(USER, b"b", b"1", 0).unwrap(); // flush -> L1R0

    engine.delete(USER, b"a").unwrap();
    engine.put(USER, b"c", b"1", 0).unwrap(); // flush -> L1R1 -> compact

    let merged = data_records(&conf, 2, 0);
    assert_eq!(merged.len(), 3);
    let a = merged.iter().find(|r| r.key == b"a").unwrap();
    assert!(a.is_deleted(), "tombstone must be preserved, not dropped");

    assert!(engine.get(USER, b"a").unwrap().is_none());
}

// -------------------- Chaining --------------------

#[test]
fn compaction_chains_through_filled_levels() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    conf.lsm_run_max = 2;
    let mut engine = open(&conf);

    // Eight distinct keys = four flushes. Each pair of level-1 runs folds
    // into level 2; the second level-2 run then folds into level 3.
    for i in 0..8u32 {
        engine
            .put(USER, format!("key_{}", i).as_bytes(), b"v", 0)
            .unwrap();
    }

    assert_eq!(runs_on_level(&conf, 1), 0);
    assert_eq!(runs_on_level(&conf, 2), 0);
    assert_eq!(runs_on_level(&conf, 3), 1);
    assert_eq!(data_records(&conf, 3, 0).len(), 8);

    for i in 0..8u32 {
        let key = format!("key_{}", i);
        assert!(
            engine.get(USER, key.as_bytes()).unwrap().is_some(),
            "{} lost in compaction",
            key
        );
    }
}

#[test]
fn max_level_never_compacts() {
    let dir = tempdir().unwrap();
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    conf.lsm_run_max = 2;
    conf.lsm_lvl_max = 2;
    let mut engine = open(&conf);

    // With lvl_max = 2, level 2 is terminal: runs accumulate there beyond
    // lsm_run_max instead of folding into level 3.
    for i in 0..16u32 {
        engine
            .put(USER, format!("key_{:02}", i).as_bytes(), b"v", 0)
            .unwrap();
    }

    assert_eq!(runs_on_level(&conf, 2), 4);
    assert_eq!(runs_on_level(&conf, 3), 0);

    for i in 0..16u32 {
        let key = format!("key_{:02}", i);
        assert!(engine.get(USER, key.as_bytes()).unwrap().is_some());
    }
}
