//! Cache Module
//!
//! Bounded in-memory cache of recently written or read records.
//!
//! ## Eviction
//! Insertion order, not access order: once full, the entry inserted longest
//! ago is evicted first. Reads never reorder entries.
//!
//! ## Data Structure Choice
//! `HashMap` for lookups plus a `VecDeque` of keys in insertion order, so
//! evicting the oldest entry is a `pop_front`.

mod record_cache;

pub use record_cache::RecordCache;
