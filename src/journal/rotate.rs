//! Journal Rotation
//!
//! Moves the current journal aside and leaves an empty one in its place.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::storage::{backup_path, suffixed, FileLock};

use super::Journal;

impl Journal {
    /// Rotate the journal into a timestamped backup.
    ///
    /// Backups land in `backup_dir`, or next to the journal when `None`.
    /// Returns `None` when the journal is missing or empty.
    ///
    /// Serialized across processes by an exclusive lock on `<journal>.lock`.
    pub fn rotate(&self, backup_dir: Option<&Path>) -> Result<Option<PathBuf>> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(suffixed(&self.path, ".lock"))?;
        let _lock = FileLock::exclusive(&lock_file)?;

        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if len == 0 {
            return Ok(None);
        }

        let dir = match backup_dir {
            Some(dir) => dir.to_path_buf(),
            None => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(&dir)?;
        }
        let target = backup_path(&dir, &self.path);

        if let Err(e) = fs::rename(&self.path, &target) {
            // Cross-filesystem moves fail; copy then truncate instead
            warn!(
                from = %self.path.display(),
                to = %target.display(),
                "rename failed ({}), falling back to copy and truncate",
                e
            );
            fs::copy(&self.path, &target)?;
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        info!(path = %self.path.display(), backup = %target.display(), bytes = len, "rotated journal");
        Ok(Some(target))
    }
}
