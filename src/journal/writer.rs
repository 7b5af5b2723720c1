//! Journal Writer
//!
//! Handles appending entries to the journal file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::record::{validate_id, Record};
use crate::storage::FileLock;

use super::{Action, JournalEntry};

/// A table's mutation journal.
///
/// Like the data file, no descriptor is held between calls.
#[derive(Debug, Clone)]
pub struct Journal {
    pub(super) path: PathBuf,
}

impl Journal {
    /// Open (or create) the journal at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Append one entry under an exclusive lock.
    ///
    /// Rejects a malformed id before touching the file.
    pub fn write_entry(
        &self,
        action: Action,
        record_id: &str,
        data: Option<&Record>,
    ) -> Result<JournalEntry> {
        validate_id(record_id)?;

        let entry = JournalEntry::new(action, record_id, data.cloned());
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let _lock = FileLock::exclusive(&file)?;
        let mut writer = &file;
        writer.write_all(&line)?;
        writer.flush()?;

        debug!(action = ?action, record_id, "journaled mutation");
        Ok(entry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
