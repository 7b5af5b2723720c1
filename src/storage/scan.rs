//! Record Scan
//!
//! Iterator over every line of a data file, in file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fs2::FileExt;
use tracing::warn;

use crate::error::Result;
use crate::record::Record;

use super::record_file::parse_line;

/// Lazy, finite scan over a data file.
///
/// Owns its file handle and a shared lock for its whole lifetime. Yields
/// `(offset, record)` for each decodable line. Blank lines are ignored and
/// undecodable ones (torn writes, foreign garbage) are logged and skipped, so
/// one bad line never hides the records after it. I/O errors end the scan.
/// Call `RecordFile::scan` again to restart from the beginning.
pub struct RecordScan {
    reader: BufReader<File>,
    /// Byte offset of the next line to be read
    position: u64,
    /// Set after EOF or an I/O error
    done: bool,
    /// Undecodable lines passed over so far
    skipped: u64,
}

impl RecordScan {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        FileExt::lock_shared(&file)?;

        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            done: false,
            skipped: 0,
        })
    }

    /// Offset of the next line to be read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of undecodable lines skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for RecordScan {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();

        while !self.done {
            line.clear();
            let start = self.position;

            let read = match self.reader.read_until(b'\n', &mut line) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            if read == 0 {
                self.done = true;
                break;
            }
            self.position += read as u64;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match parse_line(&line, start) {
                Ok(record) => return Some(Ok((start, record))),
                Err(e) => {
                    self.skipped += 1;
                    warn!(offset = start, bytes = read, "skipping undecodable data line: {}", e);
                }
            }
        }

        None
    }
}

impl Drop for RecordScan {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.reader.get_ref());
    }
}
