//! Error types for LineDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LineDbError
pub type Result<T> = std::result::Result<T, LineDbError>;

/// Unified error type for LineDB operations
#[derive(Debug, Error)]
pub enum LineDbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Input Errors (rejected before any I/O)
    // -------------------------------------------------------------------------
    #[error("Invalid record id: {0:?} (expected a positive integer)")]
    InvalidId(String),

    #[error("Schema violation on field '{field}': expected {expected}, found {found}")]
    SchemaViolation {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Missing required field '{0}'")]
    MissingField(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Compaction failed: {reason} (live file restored from backup: {restored})")]
    CompactionFailed { reason: String, restored: bool },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
