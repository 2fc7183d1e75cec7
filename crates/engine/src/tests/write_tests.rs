use super::helpers::*;
use anyhow::Result;
use layout::TableKind;
use tempfile::tempdir;

// -------------------- Basic put / get / delete --------------------

#[test]
fn three_writes_three_reads() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open(&test_config(dir.path()));

    engine.put(USER, b"a", b"1", 0)?;
    engine.put(USER, b"b", b"2", 0)?;
    engine.put(USER, b"c", b"3", 0)?;

    assert_eq!(engine.get(USER, b"b")?.unwrap().value, b"2");
    assert!(engine.get(USER, b"z")?.is_none());
    Ok(())
}

#[test]
fn overwrite_returns_latest_value() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open(&test_config(dir.path()));

    engine.put(USER, b"k", b"v1", 0)?;
    engine.put(USER, b"k", b"v2", 0)?;

    assert_eq!(engine.get(USER, b"k")?.unwrap().value, b"v2");
    Ok(())
}

#[test]
fn type_tag_is_carried_through() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open(&test_config(dir.path()));

    engine.put(USER, b"typed", b"v", 7)?;
    assert_eq!(engine.get(USER, b"typed")?.unwrap().type_info, 7);
    Ok(())
}

#[test]
fn delete_makes_key_absent() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open(&test_config(dir.path()));

    engine.put(USER, b"k", b"v", 0)?;
    assert!(engine.delete(USER, b"k")?);
    assert!(engine.get(USER, b"k")?.is_none());
    Ok(())
}

#[test]
fn delete_of_missing_or_deleted_key_returns_false() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open(&test_config(dir.path()));

    assert!(!engine.delete(USER, b"never")?);

    engine.put(USER, b"k", b"v", 0)?;
    assert!(engine.delete(USER, b"k")?);
    assert!(!engine.delete(USER, b"k")?);
    Ok(())
}

#[test]
fn put_after_delete_resurrects() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = open(&test_config(dir.path()));

    engine.put(USER, b"k", b"v1", 0)?;
    engine.delete(USER, b"k")?;
    engine.put(USER, b"k", b"v2", 0)?;

    assert_eq!(engine.get(USER, b"k")?.unwrap().value, b"v2");
    Ok(())
}

// -------------------- Flush mechanics --------------------

#[test]
fn capacity_policy_flushes_to_level_one() -> Result<()> {
    let dir = tempdir()?;
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    let mut engine = open(&conf);

    engine.put(USER, b"a", b"1", 0)?;
    assert_eq!(engine.memtable_len(), 1);
    engine.put(USER, b"b", b"2", 0)?;

    // The flush emptied the memtable and produced a complete level-1 run.
    assert_eq!(engine.memtable_len(), 0);
    assert_eq!(runs_on_level(&conf, 1), 1);
    for kind in TableKind::ALL {
        assert!(layout::table_path(&conf.path, &conf.db_name, 1, 0, kind).exists());
    }

    // Flushed data remains readable.
    assert_eq!(engine.get(USER, b"a")?.unwrap().value, b"1");
    Ok(())
}

#[test]
fn threshold_policy_flushes_on_bytes() -> Result<()> {
    let dir = tempdir()?;
    let mut conf = test_config(dir.path());
    conf.memtable_flush_strategy = memtable::FLUSH_BY_THRESHOLD;
    conf.memtable_threshold = "1 KB".to_string();
    let mut engine = open(&conf);

    // 8 records × (30 + 4 + 100) bytes crosses 1 KiB on the 8th put.
    for i in 0..8u32 {
        engine.put(USER, &i.to_be_bytes(), &[0u8; 100], 0)?;
    }

    assert_eq!(engine.memtable_len(), 0, "threshold flush should have fired");
    assert_eq!(runs_on_level(&conf, 1), 1);
    Ok(())
}

#[test]
fn overwrite_collapses_to_one_record_per_flush() -> Result<()> {
    let dir = tempdir()?;
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    let mut engine = open(&conf);

    engine.put(USER, b"k", b"v1", 0)?;
    engine.put(USER, b"k", b"v2", 0)?; // update, no flush yet
    assert_eq!(engine.memtable_len(), 1);
    engine.put(USER, b"dummy", b"x", 0)?; // second entry, flush

    assert_eq!(engine.get(USER, b"k")?.unwrap().value, b"v2");

    let on_disk = data_records(&conf, 1, 0);
    let k_records: Vec<_> = on_disk.iter().filter(|r| r.key == b"k").collect();
    assert_eq!(k_records.len(), 1);
    assert_eq!(k_records[0].value, b"v2");
    Ok(())
}

#[test]
fn flushed_tombstone_keeps_its_bit_on_disk() -> Result<()> {
    let dir = tempdir()?;
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    let mut engine = open(&conf);

    engine.put(USER, b"k", b"v", 0)?;
    engine.delete(USER, b"k")?; // replaces the memtable entry
    assert!(engine.get(USER, b"k")?.is_none());

    engine.put(USER, b"dummy", b"x", 0)?; // triggers the flush

    assert!(engine.get(USER, b"k")?.is_none());
    let stored: Vec<_> = data_records(&conf, 1, 0)
        .into_iter()
        .filter(|r| r.key == b"k")
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_deleted());
    Ok(())
}

#[test]
fn manual_flush_on_empty_memtable_is_noop() -> Result<()> {
    let dir = tempdir()?;
    let conf = test_config(dir.path());
    let mut engine = open(&conf);

    engine.flush()?;
    assert_eq!(
        layout::last_level(&conf.path, &conf.db_name)?,
        -1,
        "no table should have been written"
    );
    Ok(())
}

#[test]
fn flush_truncates_the_wal() -> Result<()> {
    let dir = tempdir()?;
    let mut conf = test_config(dir.path());
    conf.memtable_capacity = 2;
    let mut engine = open(&conf);

    engine.put(USER, b"a", b"1", 0)?;
    engine.put(USER, b"b", b"2", 0)?; // flush

    // Everything below the low-water mark is gone; with the default lwm of
    // 2 and a single segment, the whole log collapses to one empty segment.
    assert_eq!(engine.wal.segment_count(), 1);
    assert!(engine.wal.read_all()?.is_empty());
    assert!(layout::log_path(&conf.wal_path, &conf.db_name, 0).exists());
    Ok(())
}
