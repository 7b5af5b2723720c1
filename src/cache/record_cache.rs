//! RecordCache implementation

use std::collections::{HashMap, VecDeque};

use crate::record::Record;

/// Insertion-ordered, bounded cache keyed by record id
///
/// `put`, `get` and `remove` are O(1). `remove` only drops the map entry; its
/// slot in `order` goes stale and is skipped at eviction time, recognised by
/// a generation number that no longer matches the entry's.
#[derive(Debug)]
pub struct RecordCache {
    capacity: usize,
    /// id -> (generation, record)
    entries: HashMap<String, (u64, Record)>,
    /// (id, generation), oldest first; may hold stale slots
    order: VecDeque<(String, u64)>,
    next_generation: u64,
}

impl RecordCache {
    /// Create a cache holding at most `capacity` records.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            next_generation: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.entries.get(id).map(|(_, record)| record)
    }

    /// Insert or refresh a record.
    ///
    /// Refreshing keeps the entry's original position in eviction order.
    pub fn put(&mut self, id: &str, record: Record) {
        if self.capacity == 0 {
            return;
        }

        if let Some((_, existing)) = self.entries.get_mut(id) {
            *existing = record;
            return;
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some((oldest, generation)) => {
                    if self.is_current(&oldest, generation) {
                        self.entries.remove(&oldest);
                    }
                }
                None => break,
            }
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries.insert(id.to_string(), (generation, record));
        self.order.push_back((id.to_string(), generation));

        if self.order.len() > 2 * self.capacity {
            self.drop_stale_slots();
        }
    }

    /// Evict a single id, returning its record if it was cached
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        self.entries.remove(id).map(|(_, record)| record)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_current(&self, id: &str, generation: u64) -> bool {
        matches!(self.entries.get(id), Some((current, _)) if *current == generation)
    }

    /// Amortized over the removals that produced the stale slots
    fn drop_stale_slots(&mut self) {
        let order = std::mem::take(&mut self.order);
        self.order = order
            .into_iter()
            .filter(|(id, generation)| self.is_current(id, *generation))
            .collect();
    }
}
