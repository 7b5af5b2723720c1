//! Storage Module
//!
//! The record store: one append-only JSON-lines data file per table.
//!
//! ## Responsibilities
//! - Append record versions and report the byte offset of each line
//! - Offset-addressed point reads
//! - Lazy sequential scans for full-table queries
//! - Compaction down to the winning line per id, with backup and restore
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ offset 0   {"id":"1","name":"Ann","_deleted":false,...}\n  │
//! │ offset 61  {"id":"2","name":"Bob","_deleted":false,...}\n  │
//! │ offset 122 {"id":"1","name":"Ann","age":31,...}\n          │  ← new version
//! │ offset 190 {"id":"1",...,"_deleted":true,"_superseded":..} │  ← dead marker
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are never rewritten in place. Updates and deletes append.

mod lock;
mod record_file;
mod scan;
mod compaction;

pub use record_file::RecordFile;
pub use scan::RecordScan;
pub use compaction::CompactionOutcome;

pub(crate) use lock::FileLock;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::record::file_timestamp;

/// `path` with `suffix` appended to its file name ("t.jsonl" → "t.jsonl.tmp")
pub(crate) fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Timestamped backup location for `path` inside `dir`
pub(crate) fn backup_path(dir: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    dir.join(format!("{}.{}.bak", name, file_timestamp()))
}
