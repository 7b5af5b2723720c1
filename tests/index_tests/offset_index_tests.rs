//! Tests for OffsetIndex
//!
//! These tests verify:
//! - Lookups and mutations
//! - Auto-commit vs explicit commit
//! - Snapshot format and atomic replacement
//! - Quarantine of a corrupt snapshot

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use linedb::index::OffsetIndex;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("table.idx.json");
    (temp_dir, path)
}

fn read_snapshot(path: &PathBuf) -> HashMap<String, u64> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_missing_file_is_empty() {
    let (_temp, path) = setup_temp_index();

    let index = OffsetIndex::open(&path, true).unwrap();

    assert_eq!(index.count(), 0);
    assert!(index.is_empty());
    assert!(!index.is_dirty());
    assert!(!index.was_recovered());
}

#[test]
fn test_open_blank_file_is_empty() {
    let (_temp, path) = setup_temp_index();
    fs::write(&path, "  \n").unwrap();

    let index = OffsetIndex::open(&path, true).unwrap();

    assert!(index.is_empty());
    assert!(!index.was_recovered());
}

#[test]
fn test_open_loads_snapshot() {
    let (_temp, path) = setup_temp_index();
    fs::write(&path, r#"{"1": 0, "2": 57}"#).unwrap();

    let index = OffsetIndex::open(&path, true).unwrap();

    assert_eq!(index.get("1"), Some(0));
    assert_eq!(index.get("2"), Some(57));
    assert_eq!(index.count(), 2);
}

#[test]
fn test_open_corrupt_snapshot_is_quarantined() {
    let (temp, path) = setup_temp_index();
    fs::write(&path, "{\"1\": 0, \"2\":").unwrap();

    let index = OffsetIndex::open(&path, true).unwrap();

    assert!(index.is_empty());
    assert!(index.was_recovered());
    assert!(!path.exists());

    let quarantined: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("table.idx.json.corrupt."))
        .collect();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(
        fs::read_to_string(temp.path().join(&quarantined[0])).unwrap(),
        "{\"1\": 0, \"2\":"
    );
}

// =============================================================================
// Lookup / Mutation Tests
// =============================================================================

#[test]
fn test_set_get_contains_remove() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();

    assert_eq!(index.set("7", 120).unwrap(), None);
    assert!(index.contains("7"));
    assert_eq!(index.get("7"), Some(120));

    assert_eq!(index.set("7", 300).unwrap(), Some(120));
    assert_eq!(index.get("7"), Some(300));

    assert_eq!(index.remove("7").unwrap(), Some(300));
    assert!(!index.contains("7"));
    assert_eq!(index.get("7"), None);
}

#[test]
fn test_remove_absent_id_is_noop() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();

    assert_eq!(index.remove("9").unwrap(), None);
    assert!(!index.is_dirty());
}

#[test]
fn test_all_ids_in_numeric_order() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();

    for id in ["10", "2", "1", "33", "3"] {
        index.set(id, 0).unwrap();
    }

    assert_eq!(index.all_ids(), vec!["1", "2", "3", "10", "33"]);
    assert_eq!(index.max_id(), 33);
}

#[test]
fn test_max_id_empty() {
    let (_temp, path) = setup_temp_index();
    let index = OffsetIndex::open(&path, false).unwrap();

    assert_eq!(index.max_id(), 0);
}

#[test]
fn test_replace_all() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();
    index.set("1", 10).unwrap();
    index.set("2", 20).unwrap();

    let fresh: HashMap<String, u64> = [("3".to_string(), 0)].into_iter().collect();
    index.replace_all(fresh).unwrap();

    assert_eq!(index.all_ids(), vec!["3"]);
    assert!(index.is_dirty());
}

// =============================================================================
// Commit Tests
// =============================================================================

#[test]
fn test_auto_commit_persists_every_mutation() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, true).unwrap();

    index.set("1", 0).unwrap();
    assert!(!index.is_dirty());
    assert_eq!(read_snapshot(&path).get("1"), Some(&0));

    index.set("2", 44).unwrap();
    index.remove("1").unwrap();
    let snapshot = read_snapshot(&path);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("2"), Some(&44));
}

#[test]
fn test_buffered_mode_persists_only_on_commit() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();

    index.set("1", 0).unwrap();
    assert!(index.is_dirty());
    assert!(!path.exists());

    index.commit().unwrap();
    assert!(!index.is_dirty());
    assert_eq!(read_snapshot(&path).get("1"), Some(&0));
}

#[test]
fn test_commit_when_clean_is_noop() {
    let (_temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();

    index.commit().unwrap();

    assert!(!path.exists());
}

#[test]
fn test_commit_leaves_no_temp_file() {
    let (temp, path) = setup_temp_index();
    let mut index = OffsetIndex::open(&path, false).unwrap();
    index.set("1", 0).unwrap();

    index.commit().unwrap();

    assert!(!temp.path().join("table.idx.json.tmp").exists());
}

#[test]
fn test_snapshot_round_trips_through_reopen() {
    let (_temp, path) = setup_temp_index();
    {
        let mut index = OffsetIndex::open(&path, false).unwrap();
        for i in 1..=50u64 {
            index.set(&i.to_string(), i * 100).unwrap();
        }
        index.remove("25").unwrap();
        index.commit().unwrap();
    }

    let index = OffsetIndex::open(&path, false).unwrap();

    assert_eq!(index.count(), 49);
    assert_eq!(index.get("50"), Some(5000));
    assert!(!index.contains("25"));
}
