//! Offset Index implementation
//!
//! HashMap-backed index with a dirty flag and optional auto-commit.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::{file_timestamp, id_sort_key};
use crate::storage::suffixed;

/// Maps record id → byte offset into the data file
#[derive(Debug)]
pub struct OffsetIndex {
    /// Snapshot location
    path: PathBuf,

    offsets: HashMap<String, u64>,

    /// In-memory map differs from the snapshot on disk
    dirty: bool,

    /// Commit after every mutation
    auto_commit: bool,

    /// The snapshot was unreadable at open and has been quarantined
    recovered: bool,
}

impl OffsetIndex {
    /// Load the index snapshot at `path`.
    ///
    /// - Missing or blank file → empty index
    /// - Unparseable file → moved to `<path>.corrupt.<timestamp>`, empty index,
    ///   `was_recovered()` returns true
    pub fn open(path: &Path, auto_commit: bool) -> Result<Self> {
        let mut index = Self {
            path: path.to_path_buf(),
            offsets: HashMap::new(),
            dirty: false,
            auto_commit,
            recovered: false,
        };

        if !path.exists() {
            return Ok(index);
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(index);
        }

        match serde_json::from_str::<HashMap<String, u64>>(&contents) {
            Ok(offsets) => {
                debug!(path = %path.display(), entries = offsets.len(), "loaded offset index");
                index.offsets = offsets;
            }
            Err(e) => {
                let quarantine = suffixed(path, &format!(".corrupt.{}", file_timestamp()));
                fs::rename(path, &quarantine)?;
                warn!(
                    path = %path.display(),
                    quarantine = %quarantine.display(),
                    "index snapshot is corrupt ({}), starting from an empty index",
                    e
                );
                index.recovered = true;
            }
        }

        Ok(index)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn get(&self, id: &str) -> Option<u64> {
        self.offsets.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.offsets.contains_key(id)
    }

    /// All indexed ids, in numeric order
    pub fn all_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.offsets.keys().cloned().collect();
        ids.sort_by(|a, b| id_sort_key(a).cmp(&id_sort_key(b)));
        ids
    }

    /// Largest indexed id, or 0 when empty
    pub fn max_id(&self) -> u64 {
        self.offsets
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Point `id` at `offset`, returning the previous offset
    pub fn set(&mut self, id: &str, offset: u64) -> Result<Option<u64>> {
        let previous = self.offsets.insert(id.to_string(), offset);
        self.dirty = true;
        self.maybe_commit()?;
        Ok(previous)
    }

    /// Drop `id`, returning its offset if it was indexed
    pub fn remove(&mut self, id: &str) -> Result<Option<u64>> {
        let previous = self.offsets.remove(id);
        if previous.is_some() {
            self.dirty = true;
            self.maybe_commit()?;
        }
        Ok(previous)
    }

    /// Swap in a whole new map (after compaction or rebuild)
    pub fn replace_all(&mut self, offsets: HashMap<String, u64>) -> Result<()> {
        self.offsets = offsets;
        self.dirty = true;
        self.maybe_commit()
    }

    /// Persist the map if it changed since the last commit.
    ///
    /// Writes `<path>.tmp`, syncs it, then renames it over the snapshot.
    pub fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = suffixed(&self.path, ".tmp");
        let bytes = serde_json::to_vec(&self.offsets)?;
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.offsets.len(), "committed offset index");
        Ok(())
    }

    fn maybe_commit(&mut self) -> Result<()> {
        if self.auto_commit {
            self.commit()
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// True when the snapshot was corrupt at open and has been quarantined
    pub fn was_recovered(&self) -> bool {
        self.recovered
    }

    /// Clear the recovery flag once the index has been rebuilt
    pub(crate) fn mark_rebuilt(&mut self) {
        if self.recovered {
            info!(path = %self.path.display(), "offset index rebuilt after recovery");
        }
        self.recovered = false;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
