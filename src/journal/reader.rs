//! Journal Reader
//!
//! Streams entries back out of the journal, skipping lines that do not parse.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use tracing::warn;

use crate::error::Result;
use crate::storage::FileLock;

use super::{Journal, JournalEntry};

impl Journal {
    /// Read up to `limit` valid entries after skipping the first `offset`.
    ///
    /// Malformed lines are logged and skipped; they do not count towards
    /// `offset` or `limit`. A missing journal reads as empty.
    pub fn read_entries(&self, limit: Option<usize>, offset: usize) -> Result<Vec<JournalEntry>> {
        let mut entries = Vec::new();
        if limit == Some(0) {
            return Ok(entries);
        }

        let mut skipped = 0usize;
        self.for_each_valid(|entry| {
            if skipped < offset {
                skipped += 1;
                return true;
            }
            entries.push(entry);
            limit.map_or(true, |max| entries.len() < max)
        })?;

        Ok(entries)
    }

    /// Number of well-formed entries in the journal
    pub fn entry_count(&self) -> Result<usize> {
        let mut count = 0usize;
        self.for_each_valid(|_| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// Feed each parseable entry to `visit` until it returns false
    fn for_each_valid<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(JournalEntry) -> bool,
    {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let _lock = FileLock::shared(&file)?;

        for (line_no, line) in BufReader::new(&file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(entry) => {
                    if !visit(entry) {
                        break;
                    }
                }
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    "skipping malformed journal line: {}",
                    e
                ),
            }
        }

        Ok(())
    }
}
