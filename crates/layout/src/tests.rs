use super::*;
use tempfile::tempdir;

// -------------------- Helpers --------------------

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"").unwrap();
}

// -------------------- Path building & parsing --------------------

#[test]
fn table_path_format() {
    let p = table_path(Path::new("/data"), "silt", 2, 0, TableKind::Summary);
    assert_eq!(p, Path::new("/data/silt-2-0-summary.db"));
}

#[test]
fn log_path_format() {
    let p = log_path(Path::new("/log"), "silt", 3);
    assert_eq!(p, Path::new("/log/silt-3.log"));
}

#[test]
#[should_panic(expected = "table level must be >= 1")]
fn table_path_rejects_level_zero() {
    table_path(Path::new("/data"), "silt", 0, 0, TableKind::Data);
}

#[test]
fn parse_inverts_table_path() {
    for kind in TableKind::ALL {
        let p = table_path(Path::new(""), "mydb", 3, 7, kind);
        let name = p.file_name().unwrap().to_str().unwrap();
        assert_eq!(
            parse(name),
            Some(ParsedName::Table {
                db: "mydb".to_string(),
                level: 3,
                run: 7,
                kind,
            })
        );
    }
}

#[test]
fn parse_inverts_log_path() {
    let p = log_path(Path::new(""), "mydb", 12);
    let name = p.file_name().unwrap().to_str().unwrap();
    assert_eq!(
        parse(name),
        Some(ParsedName::Log {
            db: "mydb".to_string(),
            index: 12,
        })
    );
}

#[test]
fn parse_handles_dashes_in_db_name() {
    assert_eq!(
        parse("my-cool-db-1-0-data.db"),
        Some(ParsedName::Table {
            db: "my-cool-db".to_string(),
            level: 1,
            run: 0,
            kind: TableKind::Data,
        })
    );
}

#[test]
fn parse_rejects_foreign_files() {
    assert_eq!(parse("README.md"), None);
    assert_eq!(parse("silt-1-0-bogus.db"), None);
    assert_eq!(parse("silt-abc.log"), None);
    assert_eq!(parse("silt-0-0-data.db"), None); // level 0 never exists
    assert_eq!(parse("noextension"), None);
}

// -------------------- Directory scans --------------------

#[test]
fn last_level_and_run_scan() {
    let dir = tempdir().unwrap();
    let d = dir.path();

    assert_eq!(last_level(d, "silt").unwrap(), -1);
    assert_eq!(last_run(d, "silt", 1).unwrap(), -1);

    touch(d, "silt-1-0-data.db");
    touch(d, "silt-1-1-data.db");
    touch(d, "silt-2-0-data.db");
    touch(d, "other-9-9-data.db"); // different database, ignored
    touch(d, "notes.txt");

    assert_eq!(last_level(d, "silt").unwrap(), 2);
    assert_eq!(last_run(d, "silt", 1).unwrap(), 1);
    assert_eq!(last_run(d, "silt", 2).unwrap(), 0);
    assert_eq!(last_run(d, "silt", 3).unwrap(), -1);
}

#[test]
fn numeric_indices_sort_naturally() {
    let dir = tempdir().unwrap();
    let d = dir.path();

    // Lexicographic order would put "10" before "9".
    for i in [0u64, 9, 10, 11] {
        touch(d, &format!("silt-{}.log", i));
    }

    assert_eq!(last_log(d, "silt").unwrap(), 11);
    let segs = segment_paths(d, "silt").unwrap();
    let names: Vec<_> = segs
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["silt-0.log", "silt-9.log", "silt-10.log", "silt-11.log"]);
}

#[test]
fn run_groups_collects_siblings() {
    let dir = tempdir().unwrap();
    let d = dir.path();

    for kind in TableKind::ALL {
        touch(
            d,
            table_path(d, "silt", 1, 0, kind)
                .file_name()
                .unwrap()
                .to_str()
                .unwrap(),
        );
    }
    touch(d, "silt-1-1-data.db"); // incomplete group

    let groups = run_groups(d, "silt").unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&(1, 0)].len(), 5);
    assert_eq!(groups[&(1, 1)], vec![TableKind::Data]);
}
