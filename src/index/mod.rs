//! Index Module
//!
//! In-memory `id -> byte offset` map plus its durable snapshot.
//!
//! ## Responsibilities
//! - Single source of truth for "does this id exist"
//! - Point every live id at the offset of its latest non-deleted line
//! - Persist via temp file + atomic rename, immediately or on demand
//! - Quarantine an unreadable snapshot instead of failing to open
//!
//! ## File Format
//! ```text
//! {"1": 0, "2": 61, "7": 402}
//! ```

mod offset_index;

pub use offset_index::OffsetIndex;
