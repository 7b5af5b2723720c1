//! Configuration for a LineDB table
//!
//! A table is described by exactly three file paths plus an auto-commit flag.
//! The engine never discovers paths on its own; `for_table` is a convenience
//! for callers that keep all of a table's files in one directory.

use std::path::{Path, PathBuf};

/// Configuration for one table, immutable for the lifetime of an engine
#[derive(Debug, Clone)]
pub struct TableConfig {
    // -------------------------------------------------------------------------
    // File Layout
    // -------------------------------------------------------------------------
    /// Append-only JSON-lines data file
    pub data_path: PathBuf,

    /// JSON object snapshot of `id -> byte offset`
    pub index_path: PathBuf,

    /// Append-only mutation journal
    pub log_path: PathBuf,

    /// Directory receiving data-file and journal backups.
    /// Defaults to `<data dir>/backups` when unset.
    pub backup_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Persist the index after every mutation (safest, slowest)
    pub auto_commit: bool,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max number of records held in the in-memory cache
    pub cache_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::for_table("./linedb_data", "table")
    }
}

impl TableConfig {
    /// Default cache size (records)
    pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

    /// Create a new config builder
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Derive all three paths for `name` inside `dir`:
    /// `{name}.jsonl`, `{name}.idx.json` and `{name}.log`
    pub fn for_table(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join(format!("{}.jsonl", name)),
            index_path: dir.join(format!("{}.idx.json", name)),
            log_path: dir.join(format!("{}.log", name)),
            backup_dir: None,
            auto_commit: true,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Resolved backup directory
    pub fn backup_dir(&self) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => self
                .data_path
                .parent()
                .map(|p| p.join("backups"))
                .unwrap_or_else(|| PathBuf::from("backups")),
        }
    }
}

/// Builder for TableConfig
#[derive(Default)]
pub struct TableConfigBuilder {
    config: TableConfig,
}

impl TableConfigBuilder {
    /// Set the data file path
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_path = path.into();
        self
    }

    /// Set the index file path
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    /// Set the journal file path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Set the backup directory
    pub fn backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backup_dir = Some(path.into());
        self
    }

    /// Enable or disable index auto-commit
    pub fn auto_commit(mut self, enabled: bool) -> Self {
        self.config.auto_commit = enabled;
        self
    }

    /// Set the cache capacity (in records)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> TableConfig {
        self.config
    }
}
