//! # LineDB
//!
//! A single-node, file-backed record store with:
//! - Append-only JSON-lines data files (one per table)
//! - A byte-offset index persisted via atomic rename
//! - A mutation journal with rotation
//! - Advisory file locks for multi-process access on one host
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TableEngine                             │
//! │     insert / update / delete / select / find / compact       │
//! └──────┬──────────────────┬──────────────────┬────────────────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!  ┌────────────┐    ┌─────────────┐    ┌─────────────┐
//!  │ RecordFile │    │ OffsetIndex │    │   Journal   │
//!  │  (.jsonl)  │    │ (.idx.json) │    │   (.log)    │
//!  └────────────┘    └─────────────┘    └─────────────┘
//!        ▲
//!        │ cached reads
//!  ┌────────────┐
//!  │RecordCache │
//!  └────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use linedb::{TableConfig, TableEngine};
//! use serde_json::json;
//!
//! let engine = TableEngine::open(TableConfig::for_table("./data", "users"))?;
//! let data = json!({"name": "Ann", "age": 30});
//! let id = engine.insert_next(data.as_object().unwrap())?;
//! assert!(engine.select(&id)?.is_some());
//! # Ok::<(), linedb::LineDbError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod record;
pub mod schema;

pub mod storage;
pub mod index;
pub mod journal;
pub mod cache;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LineDbError, Result};
pub use config::TableConfig;
pub use engine::TableEngine;
pub use record::Record;
pub use schema::{FieldSpec, FieldType, Schema};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LineDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
