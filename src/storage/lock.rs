//! Advisory file locks
//!
//! Scoped to one open file handle; released when the guard drops.

use std::fs::File;
use std::io;

use fs2::FileExt;

/// Holds an `flock`-style lock on a file until dropped
pub(crate) struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Block until an exclusive (writer) lock is held
    pub fn exclusive(file: &'a File) -> io::Result<Self> {
        FileExt::lock_exclusive(file)?;
        Ok(Self { file })
    }

    /// Block until a shared (reader) lock is held
    pub fn shared(file: &'a File) -> io::Result<Self> {
        FileExt::lock_shared(file)?;
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}
