//! Engine Module
//!
//! The table engine: sequences record-level CRUD over the data file, the
//! offset index and the journal.
//!
//! ## Responsibilities
//! - Validate ids and schema before any I/O
//! - Append record versions, keep the index pointed at the live line
//! - Journal each applied mutation
//! - Roll the index back when a later step of a mutation fails
//! - Cache recently touched records
//! - Compaction, backups, journal rotation, index rebuild

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::RecordCache;
use crate::config::TableConfig;
use crate::error::{LineDbError, Result};
use crate::index::OffsetIndex;
use crate::journal::{Action, Journal, JournalEntry};
use crate::record::{
    is_tombstone, record_id, strip_reserved, unix_now, validate_id, Record, FIELD_CREATED_AT,
    FIELD_DELETED, FIELD_DELETED_AT, FIELD_ID, FIELD_SUPERSEDED, FIELD_UPDATED_AT,
};
use crate::schema::Schema;
use crate::storage::{CompactionOutcome, RecordFile};

/// A single table
///
/// ## Record Lifecycle
/// `absent → present → present(updated)* → absent(tombstoned)`. Once
/// tombstoned, the id may be inserted again and starts a fresh lifecycle.
///
/// ## Concurrency Model
/// - In-process: mutations are serialized by `write_lock`; the index, cache
///   and schema sit behind their own `parking_lot` locks so reads only take
///   what they touch.
/// - Across processes: only the per-call advisory file locks of the data
///   file and journal. A mutation is several file operations with no commit
///   barrier between them, so a crash can leave the data file ahead of the
///   index, or the index ahead of the journal. `rebuild_index` and
///   `compact_table` re-derive a consistent index from the data file.
///
/// With `auto_commit` off, index changes reach disk only on `commit`,
/// `compact_table`, `rebuild_index` or `close`.
pub struct TableEngine {
    /// Table configuration
    config: TableConfig,

    /// Append-only data file
    store: RecordFile,

    /// id → offset of the live line
    index: RwLock<OffsetIndex>,

    /// Audit trail of applied mutations
    journal: Journal,

    /// Recently written or read records
    cache: Mutex<RecordCache>,

    /// Optional validation contract
    schema: RwLock<Option<Schema>>,

    /// Serializes insert/update/delete/compaction
    write_lock: Mutex<()>,
}

impl TableEngine {
    /// Open or create a table
    ///
    /// On startup:
    /// 1. Open/create the data file and journal
    /// 2. Load the index snapshot
    /// 3. Rebuild the index from the data file if the snapshot was corrupt,
    ///    or missing while the data file has content
    pub fn open(config: TableConfig) -> Result<Self> {
        // Step 1: data file and journal
        let store = RecordFile::open(&config.data_path)?;
        let journal = Journal::open(&config.log_path)?;

        // Step 2: index snapshot
        let index_existed = config.index_path.exists();
        let mut index = OffsetIndex::open(&config.index_path, config.auto_commit)?;

        // Step 3: recover the index if it cannot be trusted
        if index.was_recovered() || (!index_existed && !store.is_empty()?) {
            let offsets = store.winning_offsets()?;
            info!(
                path = %config.index_path.display(),
                records = offsets.len(),
                "rebuilding offset index from data file"
            );
            index.replace_all(offsets)?;
            index.commit()?;
            index.mark_rebuilt();
        }

        info!(
            data = %config.data_path.display(),
            records = index.count(),
            auto_commit = config.auto_commit,
            "table opened"
        );

        Ok(Self {
            cache: Mutex::new(RecordCache::new(config.cache_capacity)),
            config,
            store,
            index: RwLock::new(index),
            journal,
            schema: RwLock::new(None),
            write_lock: Mutex::new(()),
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a record under `id`
    ///
    /// Returns `Ok(false)`, with no side effects, if `id` is already live.
    ///
    /// Steps:
    /// 1. Validate id and schema
    /// 2. Append the stamped record to the data file
    /// 3. Index it, then journal INSERT (index rolled back on failure)
    /// 4. Cache it
    pub fn insert(&self, id: &str, data: &Record) -> Result<bool> {
        validate_id(id)?;
        let record = self.stamp_new(id, data)?;

        let _write_guard = self.write_lock.lock();
        self.insert_locked(id, record)
    }

    /// Insert under the next free id (`max id + 1`) and return that id.
    ///
    /// Ids of deleted records at the top of the range may be handed out again.
    /// Fails with `Storage`, before any write, once the largest live id is
    /// `u64::MAX`.
    pub fn insert_next(&self, data: &Record) -> Result<String> {
        let _write_guard = self.write_lock.lock();

        let max_id = self.index.read().max_id();
        let id = match max_id.checked_add(1) {
            Some(next) => next.to_string(),
            None => {
                return Err(LineDbError::Storage(format!(
                    "no id left after {}; insert with an explicit id instead",
                    max_id
                )))
            }
        };
        let record = self.stamp_new(&id, data)?;

        if self.insert_locked(&id, record)? {
            Ok(id)
        } else {
            Err(LineDbError::Storage(format!("allocated id {} is already in use", id)))
        }
    }

    /// Update a live record by merging `data` over its current fields
    ///
    /// Returns `Ok(false)` if `id` is not live.
    ///
    /// Steps:
    /// 1. Read the current version and build the merged version
    /// 2. Append the new version and repoint the index
    /// 3. Append a dead copy of the old version, journal UPDATE
    /// 4. Refresh the cache
    ///
    /// If anything after the repoint fails, the index is pointed back at the
    /// old version so it stays visible.
    pub fn update(&self, id: &str, data: &Record) -> Result<bool> {
        validate_id(id)?;

        let _write_guard = self.write_lock.lock();

        let old_offset = match self.index.read().get(id) {
            Some(offset) => offset,
            None => return Ok(false),
        };

        // Step 1: current version + merge
        let old = self.read_live(id, old_offset)?;
        if is_tombstone(&old) {
            return Ok(false);
        }

        let mut new = old.clone();
        new.remove(FIELD_DELETED_AT);
        new.remove(FIELD_SUPERSEDED);
        new.extend(strip_reserved(data));
        new.insert(FIELD_ID.to_string(), Value::from(id));
        if !new.contains_key(FIELD_CREATED_AT) {
            new.insert(FIELD_CREATED_AT.to_string(), Value::from(unix_now()));
        }
        new.insert(FIELD_UPDATED_AT.to_string(), Value::from(unix_now()));
        new.insert(FIELD_DELETED.to_string(), Value::Bool(false));
        self.validate_schema(&new)?;

        // Step 2: new version first, so it is never invisible
        let new_offset = self.store.append(&new)?;

        // Steps 2-3 with rollback
        self.with_index_rollback(id, Some(old_offset), || {
            self.index.write().set(id, new_offset)?;

            let mut dead = old.clone();
            dead.insert(FIELD_DELETED.to_string(), Value::Bool(true));
            dead.insert(FIELD_DELETED_AT.to_string(), Value::from(unix_now()));
            dead.insert(FIELD_SUPERSEDED.to_string(), Value::Bool(true));
            self.store.append(&dead)?;

            self.journal.write_entry(Action::Update, id, Some(&new))?;
            Ok(())
        })?;

        // Step 4
        self.cache.lock().put(id, new);

        debug!(id, old_offset, new_offset, "updated record");
        Ok(true)
    }

    /// Delete a live record by appending a tombstone
    ///
    /// Returns `Ok(false)` if `id` is not live.
    ///
    /// If removing the index entry or journaling fails after the tombstone is
    /// written, the index entry is restored so the record stays reachable.
    /// The tombstone line itself stays in the data file, though, so a later
    /// `rebuild_index` or `compact_table` picks it as the winning line and the
    /// record is dropped. Retrying the delete, or updating the record (which
    /// appends a newer winning line), settles it.
    pub fn delete(&self, id: &str) -> Result<bool> {
        validate_id(id)?;

        let _write_guard = self.write_lock.lock();

        let offset = match self.index.read().get(id) {
            Some(offset) => offset,
            None => return Ok(false),
        };

        let current = self.read_live(id, offset)?;
        if is_tombstone(&current) {
            return Ok(false);
        }

        let mut tombstone = current;
        tombstone.remove(FIELD_SUPERSEDED);
        tombstone.insert(FIELD_DELETED.to_string(), Value::Bool(true));
        tombstone.insert(FIELD_DELETED_AT.to_string(), Value::from(unix_now()));
        let tombstone_offset = self.store.append(&tombstone)?;

        self.with_index_rollback(id, Some(offset), || {
            self.index.write().remove(id)?;
            self.journal.write_entry(Action::Delete, id, None)?;
            Ok(())
        })?;

        self.cache.lock().remove(id);

        debug!(id, tombstone_offset, "deleted record");
        Ok(true)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the current version of a record
    ///
    /// Lookup order:
    /// 1. Cache
    /// 2. Index → data file (cached on success)
    pub fn select(&self, id: &str) -> Result<Option<Record>> {
        validate_id(id)?;

        if let Some(record) = self.cache.lock().get(id) {
            return Ok(Some(record.clone()));
        }

        let offset = match self.index.read().get(id) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let record = self.read_live(id, offset)?;
        if is_tombstone(&record) {
            return Ok(None);
        }

        self.cache.lock().put(id, record.clone());
        Ok(Some(record))
    }

    /// Current version of every live record, in id order
    pub fn select_all(&self) -> Result<Vec<Record>> {
        let ids = self.index.read().all_ids();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.select(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Scan the data file and return lines matching `predicate`
    ///
    /// Skips the first `offset` matches and stops after `limit` results.
    ///
    /// This is a raw scan: it does not consult the index, so superseded
    /// versions, dead copies and tombstones are all offered to the predicate.
    /// Use `find_current` (or `select_all` + filter) for live records only.
    pub fn find<P>(&self, predicate: P, limit: Option<usize>, offset: usize) -> Result<Vec<Record>>
    where
        P: Fn(&Record) -> bool,
    {
        self.scan_matching(|_, record| predicate(record), limit, offset)
    }

    /// Like `find`, but only offers the live line of each indexed id
    pub fn find_current<P>(
        &self,
        predicate: P,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Record>>
    where
        P: Fn(&Record) -> bool,
    {
        let index = self.index.read();
        self.scan_matching(
            |line_offset, record| {
                let live = record_id(record)
                    .and_then(|id| index.get(id))
                    .map_or(false, |indexed| indexed == line_offset);
                live && predicate(record)
            },
            limit,
            offset,
        )
    }

    /// Whether `id` is live
    pub fn contains(&self, id: &str) -> bool {
        self.index.read().contains(id)
    }

    /// Number of live records
    pub fn count(&self) -> usize {
        self.index.read().count()
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Install a schema consulted by `insert`, `insert_next` and `update`
    pub fn set_schema(&self, schema: Schema) {
        *self.schema.write() = Some(schema);
    }

    pub fn clear_schema(&self) {
        *self.schema.write() = None;
    }

    pub fn schema(&self) -> Option<Schema> {
        self.schema.read().clone()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Rewrite the data file down to live records
    ///
    /// Steps:
    /// 1. Commit the index
    /// 2. Compact the data file (backed up first, restored on failure)
    /// 3. Replace and commit the index, clear the cache
    ///
    /// Must not run while another process appends to the same table.
    pub fn compact_table(&self) -> Result<CompactionOutcome> {
        let _write_guard = self.write_lock.lock();
        let backup_dir = self.config.backup_dir();

        self.index.write().commit()?;
        let outcome = self.store.compact(&backup_dir)?;

        {
            let mut index = self.index.write();
            index.replace_all(outcome.offsets.clone())?;
            index.commit()?;
        }
        self.cache.lock().clear();

        info!(
            records = outcome.records_retained,
            reclaimed_bytes = outcome.bytes_before.saturating_sub(outcome.bytes_after),
            "table compacted"
        );
        Ok(outcome)
    }

    /// Recompute the index from the data file's winning lines
    ///
    /// Repairs an index left behind by a crash between steps of a mutation.
    /// Returns the number of live records.
    pub fn rebuild_index(&self) -> Result<usize> {
        let _write_guard = self.write_lock.lock();

        let offsets = self.store.winning_offsets()?;
        let count = offsets.len();

        {
            let mut index = self.index.write();
            index.replace_all(offsets)?;
            index.commit()?;
            index.mark_rebuilt();
        }
        self.cache.lock().clear();

        info!(records = count, "offset index rebuilt");
        Ok(count)
    }

    /// Persist the index now
    pub fn commit(&self) -> Result<()> {
        self.index.write().commit()
    }

    /// Copy the data file into the backup directory
    pub fn backup(&self) -> Result<PathBuf> {
        self.store.backup(&self.config.backup_dir())
    }

    /// Read journal entries, oldest first
    pub fn read_log(&self, limit: Option<usize>, offset: usize) -> Result<Vec<JournalEntry>> {
        self.journal.read_entries(limit, offset)
    }

    /// Rotate the journal into the backup directory
    pub fn rotate_log(&self) -> Result<Option<PathBuf>> {
        self.journal.rotate(Some(self.config.backup_dir().as_path()))
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Commit the index and close the table
    pub fn close(self) -> Result<()> {
        self.index.write().commit()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordFile {
        &self.store
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Indexed offset of `id`
    pub fn offset_of(&self, id: &str) -> Option<u64> {
        self.index.read().get(id)
    }

    /// Snapshot of the whole index
    pub fn index_snapshot(&self) -> HashMap<String, u64> {
        let index = self.index.read();
        index
            .all_ids()
            .into_iter()
            .filter_map(|id| index.get(&id).map(|offset| (id, offset)))
            .collect()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Called with `write_lock` held and `record` fully stamped
    fn insert_locked(&self, id: &str, record: Record) -> Result<bool> {
        if self.index.read().contains(id) {
            return Ok(false);
        }

        let offset = self.store.append(&record)?;

        self.with_index_rollback(id, None, || {
            self.index.write().set(id, offset)?;
            self.journal.write_entry(Action::Insert, id, Some(&record))?;
            Ok(())
        })?;

        self.cache.lock().put(id, record);

        debug!(id, offset, "inserted record");
        Ok(true)
    }

    /// Caller data plus engine fields for a brand new record, schema-checked
    fn stamp_new(&self, id: &str, data: &Record) -> Result<Record> {
        let mut record = strip_reserved(data);
        record.insert(FIELD_ID.to_string(), Value::from(id));
        record.insert(FIELD_CREATED_AT.to_string(), Value::from(unix_now()));
        record.insert(FIELD_DELETED.to_string(), Value::Bool(false));

        self.validate_schema(&record)?;
        Ok(record)
    }

    fn validate_schema(&self, record: &Record) -> Result<()> {
        match self.schema.read().as_ref() {
            Some(schema) => schema.validate(record),
            None => Ok(()),
        }
    }

    /// Read the indexed line for `id`, checking it belongs to `id`
    fn read_live(&self, id: &str, offset: u64) -> Result<Record> {
        let record = self.store.read_at(offset)?;
        match record_id(&record) {
            Some(found) if found == id => Ok(record),
            found => Err(LineDbError::Corruption(format!(
                "index points id {} at offset {}, which holds id {:?}",
                id, offset, found
            ))),
        }
    }

    /// Run the steps that follow an index mutation; if any fails, put the
    /// index entry for `id` back to `previous` and return the error.
    fn with_index_rollback<F>(&self, id: &str, previous: Option<u64>, steps: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let err = match steps() {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let mut index = self.index.write();
        let restored = match previous {
            Some(offset) => index.set(id, offset).map(|_| ()),
            None => index.remove(id).map(|_| ()),
        };

        match restored {
            Ok(()) => warn!(id, ?previous, "mutation failed, index entry rolled back: {}", err),
            Err(restore_err) => error!(
                id,
                ?previous,
                "mutation failed ({}) and index rollback failed: {}",
                err,
                restore_err
            ),
        }

        Err(err)
    }

    fn scan_matching<F>(&self, mut matches: F, limit: Option<usize>, offset: usize) -> Result<Vec<Record>>
    where
        F: FnMut(u64, &Record) -> bool,
    {
        let mut results = Vec::new();
        if limit == Some(0) {
            return Ok(results);
        }

        let mut skipped = 0usize;
        for item in self.store.scan()? {
            let (line_offset, record) = item?;
            if !matches(line_offset, &record) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }

            results.push(record);
            if limit.map_or(false, |max| results.len() >= max) {
                break;
            }
        }

        Ok(results)
    }
}
