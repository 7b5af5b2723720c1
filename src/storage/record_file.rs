//! Record File
//!
//! Durable append/read access to one table's data file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LineDbError, Result};
use crate::record::Record;

use super::{backup_path, FileLock, RecordScan};

/// Handle on a table's append-only data file.
///
/// Holds no open file descriptor; every operation opens, locks, and releases
/// the file on its own so separate processes can share it.
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    /// Open (or create) the data file at `path`
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

    /// Append one record as a JSON line.
    ///
    /// Returns the byte offset at which the line begins. If the file ends in
    /// a partial line (a write torn by a crash), a newline is written first
    /// so the fragment stays on a line of its own.
    pub fn append(&self, record: &Record) -> Result<u64> {
        let body = serde_json::to_vec(record)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        let _lock = FileLock::exclusive(&file)?;

        // Under the exclusive lock, end-of-file is where this line lands
        let mut offset = file.metadata()?.len();
        let torn = offset > 0 && last_byte(&file)? != b'\n';

        let mut line = Vec::with_capacity(body.len() + 2);
        if torn {
            warn!(path = %self.path.display(), offset, "data file ends in a partial line, terminating it");
            line.push(b'\n');
            offset += 1;
        }
        line.extend_from_slice(&body);
        line.push(b'\n');

        let mut writer = &file;
        writer.write_all(&line)?;
        writer.flush()?;

        debug!(path = %self.path.display(), offset, bytes = line.len(), "appended record line");
        Ok(offset)
    }

    /// Read the single line that starts at `offset`
    pub fn read_at(&self, offset: u64) -> Result<Record> {
        let file = File::open(&self.path)?;
        let _lock = FileLock::shared(&file)?;

        let len = file.metadata()?.len();
        if offset >= len {
            return Err(LineDbError::Storage(format!(
                "offset {} is past end of {} ({} bytes)",
                offset,
                self.path.display(),
                len
            )));
        }

        let mut reader = BufReader::new(&file);
        reader.seek(SeekFrom::Start(offset))?;

        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line)?;

        parse_line(&line, offset)
    }

    /// Lazily stream every line in file order with its start offset.
    ///
    /// The returned scan holds a shared lock until it is dropped.
    pub fn scan(&self) -> Result<RecordScan> {
        RecordScan::open(&self.path)
    }

    /// Copy the data file into `dir` under a timestamped name
    pub fn backup(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let target = backup_path(dir, &self.path);

        let file = File::open(&self.path)?;
        let _lock = FileLock::shared(&file)?;
        fs::copy(&self.path, &target)?;

        debug!(from = %self.path.display(), to = %target.display(), "backed up data file");
        Ok(target)
    }

    /// Current size of the data file in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn last_byte(file: &File) -> Result<u8> {
    let mut reader = file;
    reader.seek(SeekFrom::End(-1))?;
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Decode one data line (trailing newline allowed) into a record object
pub(crate) fn parse_line(line: &[u8], offset: u64) -> Result<Record> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    match serde_json::from_slice::<Value>(line)? {
        Value::Object(record) => Ok(record),
        other => Err(LineDbError::Corruption(format!(
            "line at offset {} is not a record object: {}",
            offset, other
        ))),
    }
}
