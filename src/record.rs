//! Record helpers
//!
//! A record is a JSON object. A handful of field names are reserved and
//! maintained by the engine; everything else belongs to the caller.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::{LineDbError, Result};

/// A single record: field name → JSON value
pub type Record = Map<String, Value>;

// =============================================================================
// Reserved Fields
// =============================================================================

pub const FIELD_ID: &str = "id";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";
pub const FIELD_DELETED_AT: &str = "deleted_at";
pub const FIELD_DELETED: &str = "_deleted";

/// Set on the dead copy of an old version appended by an update.
/// Such lines never compete for the winning line of their id.
pub const FIELD_SUPERSEDED: &str = "_superseded";

/// Fields owned by the engine; caller-supplied values are ignored
pub const RESERVED_FIELDS: &[&str] = &[
    FIELD_ID,
    FIELD_CREATED_AT,
    FIELD_UPDATED_AT,
    FIELD_DELETED_AT,
    FIELD_DELETED,
    FIELD_SUPERSEDED,
];

// =============================================================================
// Ids
// =============================================================================

/// Check that `id` is the canonical string form of a positive integer.
///
/// "1", "42" are valid; "", "0", "007", "-3", "1.5", "abc" are not.
pub fn validate_id(id: &str) -> Result<u64> {
    let canonical = !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && !id.starts_with('0');

    match id.parse::<u64>() {
        Ok(n) if canonical && n > 0 => Ok(n),
        _ => Err(LineDbError::InvalidId(id.to_string())),
    }
}

/// Numeric ordering key for ids ("2" sorts before "10")
pub fn id_sort_key(id: &str) -> (usize, &str) {
    (id.len(), id)
}

/// Id of a stored record, if it carries a string `id`
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(FIELD_ID).and_then(Value::as_str)
}

// =============================================================================
// Flags
// =============================================================================

/// True when the line is a tombstone (`_deleted == true`)
pub fn is_tombstone(record: &Record) -> bool {
    record.get(FIELD_DELETED).and_then(Value::as_bool).unwrap_or(false)
}

/// True when the line is the dead copy of an updated version
pub fn is_superseded(record: &Record) -> bool {
    record
        .get(FIELD_SUPERSEDED)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Drop every reserved field from caller-supplied data
pub fn strip_reserved(data: &Record) -> Record {
    data.iter()
        .filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

// =============================================================================
// Time
// =============================================================================

/// Current Unix timestamp in seconds
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Timestamp suffix used for backup and quarantine file names
pub fn file_timestamp() -> String {
    Utc::now().format("%Y%m%d%H%M%S%6f").to_string()
}
