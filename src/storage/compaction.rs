//! Compaction
//!
//! Rewrites the data file down to one line per live id.
//!
//! ## Winning Line Rule
//! For each id, the last line in file order wins, except that dead copies
//! written by updates (`_superseded: true`) never win. Ids whose winning line
//! is a tombstone are dropped. Survivors keep their relative file order.
//! Undecodable lines are skipped and do not survive a rewrite.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::{LineDbError, Result};
use crate::record::{is_superseded, is_tombstone, record_id, Record};

use super::{suffixed, RecordFile};

/// Result of a successful compaction
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    /// Fresh `id -> offset` map for the rewritten file
    pub offsets: HashMap<String, u64>,

    /// Lines read from the old file
    pub lines_scanned: u64,

    /// Undecodable lines dropped (torn writes)
    pub lines_skipped: u64,

    /// Records written to the new file
    pub records_retained: usize,

    pub bytes_before: u64,
    pub bytes_after: u64,

    /// Snapshot of the pre-compaction file
    pub backup_path: PathBuf,
}

/// Winning lines per id after one pass over the file
struct Winners {
    /// id -> (offset, record), tombstoned winners already removed
    live: HashMap<String, (u64, Record)>,
    lines_scanned: u64,
    lines_skipped: u64,
}

impl RecordFile {
    /// Rebuild the data file so it holds only the winning line per id.
    ///
    /// Steps:
    /// 1. Scan every line, keep the winner per id
    /// 2. Write survivors to `<data>.compact.tmp` with fresh offsets
    /// 3. Snapshot the current file into `backup_dir`
    /// 4. Rename the temp file over the live file
    ///
    /// If step 4 fails the backup is copied back over the live file before
    /// the error is returned.
    ///
    /// Assumes no concurrent writer appends to this file meanwhile.
    pub fn compact(&self, backup_dir: &Path) -> Result<CompactionOutcome> {
        let bytes_before = self.len()?;
        let winners = self.collect_winners()?;

        // Step 2: write survivors in their original order
        let mut survivors: Vec<(u64, String, Record)> = winners
            .live
            .into_iter()
            .map(|(id, (offset, record))| (offset, id, record))
            .collect();
        survivors.sort_by_key(|(offset, _, _)| *offset);

        let tmp_path = suffixed(self.path(), ".compact.tmp");
        let mut offsets = HashMap::with_capacity(survivors.len());
        let bytes_after = {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            let mut position = 0u64;

            for (_, id, record) in &survivors {
                let mut line = serde_json::to_vec(record)?;
                line.push(b'\n');
                writer.write_all(&line)?;
                offsets.insert(id.clone(), position);
                position += line.len() as u64;
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
            position
        };

        // Step 3: snapshot before touching the live file
        let backup_path = match self.backup(backup_dir) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        // Step 4: atomic replace, restoring the snapshot on failure
        if let Err(rename_err) = fs::rename(&tmp_path, self.path()) {
            let restored = match fs::copy(&backup_path, self.path()) {
                Ok(_) => true,
                Err(restore_err) => {
                    error!(
                        path = %self.path().display(),
                        backup = %backup_path.display(),
                        "failed to restore data file after compaction error: {}",
                        restore_err
                    );
                    false
                }
            };
            let _ = fs::remove_file(&tmp_path);

            return Err(LineDbError::CompactionFailed {
                reason: format!("replacing {}: {}", self.path().display(), rename_err),
                restored,
            });
        }

        info!(
            path = %self.path().display(),
            lines_scanned = winners.lines_scanned,
            lines_skipped = winners.lines_skipped,
            records_retained = survivors.len(),
            bytes_before,
            bytes_after,
            "compacted data file"
        );

        Ok(CompactionOutcome {
            offsets,
            lines_scanned: winners.lines_scanned,
            lines_skipped: winners.lines_skipped,
            records_retained: survivors.len(),
            bytes_before,
            bytes_after,
            backup_path,
        })
    }

    /// Offsets of the winning line per live id, without rewriting anything.
    ///
    /// Used to rebuild a lost or corrupt index from the data file.
    pub fn winning_offsets(&self) -> Result<HashMap<String, u64>> {
        Ok(self
            .collect_winners()?
            .live
            .into_iter()
            .map(|(id, (offset, _))| (id, offset))
            .collect())
    }

    fn collect_winners(&self) -> Result<Winners> {
        let mut latest: HashMap<String, (u64, Record)> = HashMap::new();
        let mut lines_scanned = 0u64;

        let mut scan = self.scan()?;
        for item in scan.by_ref() {
            let (offset, record) = item?;
            lines_scanned += 1;

            if is_superseded(&record) {
                continue;
            }

            let id = match record_id(&record) {
                Some(id) => id.to_string(),
                None => {
                    warn!(offset, "skipping data line without an id");
                    continue;
                }
            };
            latest.insert(id, (offset, record));
        }

        let lines_skipped = scan.skipped();
        drop(scan);

        latest.retain(|_, (_, record)| !is_tombstone(record));

        Ok(Winners {
            live: latest,
            lines_scanned,
            lines_skipped,
        })
    }
}
