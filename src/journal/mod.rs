//! Journal Module
//!
//! Append-only audit trail of applied mutations.
//!
//! ## Responsibilities
//! - Record one entry per committed INSERT / UPDATE / DELETE
//! - Tolerant reads: malformed lines are skipped, never fatal
//! - Rotation into timestamped backups under an advisory lock
//!
//! The journal is written *after* the data file and index have been updated.
//! It records facts, it is not a write-ahead log, and is never replayed.
//!
//! ## File Format
//! ```text
//! {"timestamp":"2026-10-19T08:15:02.481337Z","action":"INSERT","recordId":"1","data":{...}}
//! {"timestamp":"2026-10-19T08:15:09.004512Z","action":"DELETE","recordId":"1","data":null}
//! ```

mod entry;
mod writer;
mod reader;
mod rotate;

pub use entry::{Action, JournalEntry};
pub use writer::Journal;
