//! Durable mutation queue.
//!
//! An ordered, append-only store of outstanding local mutations awaiting
//! remote application, persisted through the local store so entries survive
//! process restarts. Appends are safe while a push cycle is draining: the
//! push engine reads its work list once at cycle start, so an entry queued
//! mid-cycle is picked up on the next one.

use crate::error::Result;
use crate::now_millis;
use crate::store::LocalStore;
use courier_engine::{OpKind, QueueEntry};
use std::sync::Arc;

/// Durable FIFO of mutations that still need to reach the remote store.
pub struct MutationQueue {
    store: Arc<dyn LocalStore>,
}

impl MutationQueue {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Durably append a new entry with a fresh id and a zero retry counter.
    ///
    /// A store write failure is returned to the caller (the local mutation
    /// that preceded this call already happened and stands either way).
    pub async fn enqueue(
        &self,
        table: &str,
        op: OpKind,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<QueueEntry> {
        let entry = QueueEntry::new(
            uuid::Uuid::new_v4().to_string(),
            table,
            op,
            client_id,
            payload,
            now_millis(),
        );

        match self.store.append_entry(entry.clone()).await {
            Ok(()) => {
                tracing::debug!(entry_id = %entry.entry_id, table, op = %op, "mutation queued");
                Ok(entry)
            }
            Err(e) => {
                tracing::error!(table, client_id, error = %e, "failed to queue mutation");
                Err(e.into())
            }
        }
    }

    /// All entries, creation-time ascending. Safe to call repeatedly.
    pub async fn list_pending(&self) -> Result<Vec<QueueEntry>> {
        Ok(self.store.entries().await?)
    }

    /// Delete one entry. Removing an absent id is a no-op.
    pub async fn remove(&self, entry_id: &str) -> Result<()> {
        Ok(self.store.remove_entry(entry_id).await?)
    }

    /// Count one failed attempt against an entry.
    pub async fn increment_retry(&self, entry_id: &str) -> Result<()> {
        Ok(self.store.bump_retry(entry_id).await?)
    }

    /// Current queue depth.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.entry_count().await?)
    }

    /// Remove every entry. Used for local data reset / logout, never as part
    /// of an ordinary sync cycle.
    pub async fn clear(&self) -> Result<()> {
        tracing::warn!("clearing mutation queue");
        Ok(self.store.clear_entries().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn queue() -> MutationQueue {
        MutationQueue::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn enqueue_assigns_fresh_ids() {
        let queue = queue();
        let a = queue
            .enqueue("tasks", OpKind::Create, "t_1", &json!({"v": 1}))
            .await
            .unwrap();
        let b = queue
            .enqueue("tasks", OpKind::Update, "t_1", &json!({"v": 2}))
            .await
            .unwrap();

        assert_ne!(a.entry_id, b.entry_id);
        assert_eq!(a.retry_count, 0);
        assert_eq!(queue.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_pending_does_not_consume() {
        let queue = queue();
        queue
            .enqueue("tasks", OpKind::Create, "t_1", &json!({}))
            .await
            .unwrap();

        assert_eq!(queue.list_pending().await.unwrap().len(), 1);
        assert_eq!(queue.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let queue = queue();
        let entry = queue
            .enqueue("tasks", OpKind::Create, "t_1", &json!({}))
            .await
            .unwrap();
        queue
            .enqueue("tasks", OpKind::Update, "t_1", &json!({}))
            .await
            .unwrap();

        queue.remove(&entry.entry_id).await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 1);

        // absent id: no-op
        queue.remove(&entry.entry_id).await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 1);

        queue.clear().await.unwrap();
        assert_eq!(queue.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn retry_counter_persists() {
        let queue = queue();
        let entry = queue
            .enqueue("tasks", OpKind::Create, "t_1", &json!({}))
            .await
            .unwrap();

        queue.increment_retry(&entry.entry_id).await.unwrap();
        queue.increment_retry(&entry.entry_id).await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        assert_eq!(pending[0].retry_count, 2);
    }
}
