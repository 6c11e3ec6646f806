//! Local store seam and in-memory reference implementation.
//!
//! The sync engine reads and writes the device database through the
//! [`LocalStore`] trait: ordinary CRUD over records keyed by client id, the
//! queue table keyed by entry id, and a one-row-per-table watermark table.
//! Only per-statement atomicity is required; partial progress through a
//! batch is an accepted, recoverable state because every sync operation is
//! idempotent when retried.

use async_trait::async_trait;
use courier_engine::{LocalRecord, QueueEntry, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Local store failure: the embedded database could not complete a statement.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// CRUD over synchronizable records, the mutation queue, and watermarks.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Look up one record by table and client id.
    async fn record(&self, table: &str, client_id: &str) -> StoreResult<Option<LocalRecord>>;

    /// Insert or replace one record.
    async fn put_record(&self, record: LocalRecord) -> StoreResult<()>;

    /// All records in a table.
    async fn records(&self, table: &str) -> StoreResult<Vec<LocalRecord>>;

    /// Durably append a queue entry.
    async fn append_entry(&self, entry: QueueEntry) -> StoreResult<()>;

    /// All queue entries, creation-time ascending. Non-consuming.
    async fn entries(&self) -> StoreResult<Vec<QueueEntry>>;

    /// Delete one queue entry. Removing an absent id is a no-op.
    async fn remove_entry(&self, entry_id: &str) -> StoreResult<()>;

    /// Increment the retry counter of one queue entry.
    async fn bump_retry(&self, entry_id: &str) -> StoreResult<()>;

    /// Current queue depth.
    async fn entry_count(&self) -> StoreResult<usize>;

    /// Remove all queue entries. Local data reset only.
    async fn clear_entries(&self) -> StoreResult<()>;

    /// The stored watermark for a table, if any.
    async fn watermark(&self, table: &str) -> StoreResult<Option<Timestamp>>;

    /// Persist a table's watermark.
    async fn set_watermark(&self, table: &str, at: Timestamp) -> StoreResult<()>;
}

#[derive(Default)]
struct Inner {
    records: HashMap<(String, String), LocalRecord>,
    entries: Vec<QueueEntry>,
    watermarks: HashMap<String, Timestamp>,
}

/// In-memory store: the reference implementation used by the test suite and
/// a template for real embedded-database backends.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn record(&self, table: &str, client_id: &str) -> StoreResult<Option<LocalRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .records
            .get(&(table.to_string(), client_id.to_string()))
            .cloned())
    }

    async fn put_record(&self, record: LocalRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner
            .records
            .insert((record.table.clone(), record.client_id.clone()), record);
        Ok(())
    }

    async fn records(&self, table: &str) -> StoreResult<Vec<LocalRecord>> {
        let inner = self.inner.read();
        let mut records: Vec<LocalRecord> = inner
            .records
            .values()
            .filter(|r| r.table == table)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        Ok(records)
    }

    async fn append_entry(&self, entry: QueueEntry) -> StoreResult<()> {
        self.inner.write().entries.push(entry);
        Ok(())
    }

    async fn entries(&self) -> StoreResult<Vec<QueueEntry>> {
        let mut entries = self.inner.read().entries.clone();
        entries.sort();
        Ok(entries)
    }

    async fn remove_entry(&self, entry_id: &str) -> StoreResult<()> {
        self.inner
            .write()
            .entries
            .retain(|e| e.entry_id != entry_id);
        Ok(())
    }

    async fn bump_retry(&self, entry_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.iter_mut().find(|e| e.entry_id == entry_id) {
            entry.record_failure();
        }
        Ok(())
    }

    async fn entry_count(&self) -> StoreResult<usize> {
        Ok(self.inner.read().entries.len())
    }

    async fn clear_entries(&self) -> StoreResult<()> {
        self.inner.write().entries.clear();
        Ok(())
    }

    async fn watermark(&self, table: &str) -> StoreResult<Option<Timestamp>> {
        Ok(self.inner.read().watermarks.get(table).copied())
    }

    async fn set_watermark(&self, table: &str, at: Timestamp) -> StoreResult<()> {
        self.inner.write().watermarks.insert(table.to_string(), at);
        Ok(())
    }
}
