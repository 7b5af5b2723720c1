//! Tests for RecordFile
//!
//! These tests verify:
//! - Appending lines and the offsets they report
//! - Offset-addressed reads and their failure modes
//! - Lazy sequential scans
//! - Backups

use std::fs;
use std::path::PathBuf;

use linedb::record::Record;
use linedb::storage::RecordFile;
use linedb::LineDbError;
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("table.jsonl");
    (temp_dir, path)
}

fn rec(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn line_len(record: &Record) -> u64 {
    serde_json::to_vec(record).unwrap().len() as u64 + 1
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_file_and_parent_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("t.jsonl");

    let file = RecordFile::open(&path).unwrap();

    assert!(path.exists());
    assert_eq!(file.len().unwrap(), 0);
    assert!(file.is_empty().unwrap());
}

#[test]
fn test_open_keeps_existing_content() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, "{\"id\":\"1\"}\n").unwrap();

    let file = RecordFile::open(&path).unwrap();

    assert_eq!(file.len().unwrap(), 11);
}

// =============================================================================
// Append / Read Tests
// =============================================================================

#[test]
fn test_append_returns_line_start_offsets() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();

    let first = rec(json!({"id": "1", "name": "Ann"}));
    let second = rec(json!({"id": "2", "name": "Bob"}));

    let off1 = file.append(&first).unwrap();
    let off2 = file.append(&second).unwrap();

    assert_eq!(off1, 0);
    assert_eq!(off2, line_len(&first));
    assert_eq!(file.len().unwrap(), line_len(&first) + line_len(&second));
}

#[test]
fn test_append_writes_one_json_line_per_record() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();

    file.append(&rec(json!({"id": "1"}))).unwrap();
    file.append(&rec(json!({"id": "2"}))).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(contents.ends_with('\n'));
    for line in lines {
        assert!(serde_json::from_str::<serde_json::Value>(line).unwrap().is_object());
    }
}

#[test]
fn test_read_at_returns_record() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();

    file.append(&rec(json!({"id": "1", "n": 1}))).unwrap();
    let offset = file.append(&rec(json!({"id": "2", "n": 2}))).unwrap();
    file.append(&rec(json!({"id": "3", "n": 3}))).unwrap();

    let record = file.read_at(offset).unwrap();
    assert_eq!(record["id"], json!("2"));
    assert_eq!(record["n"], json!(2));
}

#[test]
fn test_read_at_past_eof_fails() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();
    file.append(&rec(json!({"id": "1"}))).unwrap();

    let len = file.len().unwrap();
    let result = file.read_at(len);

    assert!(matches!(result, Err(LineDbError::Storage(_))));
}

#[test]
fn test_read_at_invalid_json_fails() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, "not json at all\n").unwrap();
    let file = RecordFile::open(&path).unwrap();

    let result = file.read_at(0);

    assert!(matches!(result, Err(LineDbError::Serialization(_))));
}

#[test]
fn test_read_at_non_object_line_is_corruption() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, "[1,2,3]\n").unwrap();
    let file = RecordFile::open(&path).unwrap();

    let result = file.read_at(0);

    assert!(matches!(result, Err(LineDbError::Corruption(_))));
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_yields_every_line_with_offset() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();

    let mut expected = Vec::new();
    for i in 1..=5 {
        let offset = file.append(&rec(json!({"id": i.to_string()}))).unwrap();
        expected.push((offset, i.to_string()));
    }

    let scanned: Vec<(u64, String)> = file
        .scan()
        .unwrap()
        .map(|item| {
            let (offset, record) = item.unwrap();
            (offset, record["id"].as_str().unwrap().to_string())
        })
        .collect();

    assert_eq!(scanned, expected);
}

#[test]
fn test_scan_empty_file() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();

    assert_eq!(file.scan().unwrap().count(), 0);
}

#[test]
fn test_scan_skips_blank_lines_and_keeps_offsets_exact() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, "{\"id\":\"1\"}\n\n{\"id\":\"2\"}\n").unwrap();
    let file = RecordFile::open(&path).unwrap();

    let items: Vec<(u64, Record)> = file.scan().unwrap().map(|r| r.unwrap()).collect();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].0, 0);
    assert_eq!(items[1].0, 12);
    assert_eq!(file.read_at(items[1].0).unwrap()["id"], json!("2"));
}

#[test]
fn test_scan_skips_undecodable_lines() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, "{\"id\":\"1\"}\n{broken\n[1]\n{\"id\":\"2\"}\n").unwrap();
    let file = RecordFile::open(&path).unwrap();

    let mut scan = file.scan().unwrap();
    let ids: Vec<String> = scan
        .by_ref()
        .map(|item| item.unwrap().1["id"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(scan.skipped(), 2);
}

#[test]
fn test_scan_skips_invalid_utf8_line() {
    let (_temp, path) = setup_temp_file();
    let mut bytes = b"{\"id\":\"1\",\"n\":\"\xE2\x82".to_vec();
    bytes.extend_from_slice(b"\n{\"id\":\"2\"}\n");
    fs::write(&path, bytes).unwrap();
    let file = RecordFile::open(&path).unwrap();

    let items: Vec<(u64, Record)> = file.scan().unwrap().map(|r| r.unwrap()).collect();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].1["id"], json!("2"));
}

#[test]
fn test_scan_is_restartable() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();
    file.append(&rec(json!({"id": "1"}))).unwrap();
    file.append(&rec(json!({"id": "2"}))).unwrap();

    let mut first = file.scan().unwrap();
    first.next().unwrap().unwrap();
    drop(first);

    assert_eq!(file.scan().unwrap().count(), 2);
}

#[test]
fn test_append_after_scan_is_released() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();
    file.append(&rec(json!({"id": "1"}))).unwrap();

    {
        let scan = file.scan().unwrap();
        assert_eq!(scan.count(), 1);
    }

    // Shared lock dropped with the scan; exclusive append must not block
    file.append(&rec(json!({"id": "2"}))).unwrap();
    assert_eq!(file.scan().unwrap().count(), 2);
}

// =============================================================================
// Torn Write Tests
// =============================================================================

#[test]
fn test_append_terminates_partial_last_line() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();
    file.append(&rec(json!({"id": "1"}))).unwrap();

    // A crash mid-append leaves a fragment with no newline
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(b"{\"id\":\"2\",\"x\"");
    fs::write(&path, &bytes).unwrap();
    let fragment_end = bytes.len() as u64;

    let offset = file.append(&rec(json!({"id": "3"}))).unwrap();

    assert_eq!(offset, fragment_end + 1);
    assert_eq!(file.read_at(offset).unwrap()["id"], json!("3"));

    let items: Vec<(u64, Record)> = file.scan().unwrap().map(|r| r.unwrap()).collect();
    let ids: Vec<&str> = items.iter().map(|(_, r)| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(items[1].0, offset);
}

#[test]
fn test_append_after_clean_line_adds_no_separator() {
    let (_temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();
    let first = rec(json!({"id": "1"}));
    file.append(&first).unwrap();

    let offset = file.append(&rec(json!({"id": "2"}))).unwrap();

    assert_eq!(offset, line_len(&first));
    assert_eq!(file.len().unwrap(), offset + line_len(&rec(json!({"id": "2"}))));
}

// =============================================================================
// Backup Tests
// =============================================================================

#[test]
fn test_backup_copies_file_with_timestamp_suffix() {
    let (temp, path) = setup_temp_file();
    let file = RecordFile::open(&path).unwrap();
    file.append(&rec(json!({"id": "1", "name": "Ann"}))).unwrap();

    let backup_dir = temp.path().join("backups");
    let backup = file.backup(&backup_dir).unwrap();

    assert!(backup.starts_with(&backup_dir));
    let name = backup.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("table.jsonl."));
    assert!(name.ends_with(".bak"));
    assert_eq!(fs::read(&backup).unwrap(), fs::read(&path).unwrap());
}
