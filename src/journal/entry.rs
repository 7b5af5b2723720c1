//! Journal Entry definitions
//!
//! Defines the structure of individual journal lines.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Kind of mutation recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Insert,
    Update,
    Delete,
}

/// A single entry in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// ISO-8601 UTC with microseconds, e.g. `2026-10-19T08:15:02.481337Z`
    pub timestamp: String,

    pub action: Action,

    #[serde(rename = "recordId")]
    pub record_id: String,

    /// New record for INSERT/UPDATE, `null` for DELETE
    #[serde(default)]
    pub data: Option<Record>,
}

impl JournalEntry {
    /// Build an entry stamped with the current time
    pub fn new(action: Action, record_id: impl Into<String>, data: Option<Record>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            action,
            record_id: record_id.into(),
            data,
        }
    }

    /// Parsed timestamp, if well-formed
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
