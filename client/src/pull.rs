//! Pull engine - merges remote changes since per-table watermarks.
//!
//! Each table is pulled independently: a failure partway through one table
//! leaves that table's watermark untouched (the same window is re-fetched
//! next cycle - pull is idempotent per record) and never blocks the other
//! tables in the same cycle.

use crate::error::Result;
use crate::now_millis;
use crate::store::LocalStore;
use crate::transport::RemoteTransport;
use courier_engine::{merge, watermark, Timestamp};
use std::sync::Arc;

/// Result of one pull pass across all tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    /// True only if every table pulled cleanly
    pub success: bool,
    /// Joined per-table failure messages
    pub error: Option<String>,
}

/// Fetches remote changes and merges them into the local store, honoring
/// local-pending precedence.
pub struct PullEngine {
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn RemoteTransport>,
}

impl PullEngine {
    pub fn new(store: Arc<dyn LocalStore>, transport: Arc<dyn RemoteTransport>) -> Self {
        Self { store, transport }
    }

    /// One pull pass over the given tables for one identity.
    pub async fn pull(&self, tables: &[String], user_id: &str) -> PullOutcome {
        let mut failures = Vec::new();

        for table in tables {
            match self.pull_table(table, user_id).await {
                Ok(applied) => {
                    tracing::debug!(table = %table, applied, "table pulled");
                }
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "pull failed; watermark untouched");
                    failures.push(format!("{table}: {e}"));
                }
            }
        }

        PullOutcome {
            success: failures.is_empty(),
            error: if failures.is_empty() {
                None
            } else {
                Some(failures.join("; "))
            },
        }
    }

    /// Fetch and merge one table. The watermark advances only after every
    /// returned record was processed without error.
    async fn pull_table(&self, table: &str, user_id: &str) -> Result<usize> {
        let since = self.store.watermark(table).await?;
        let records = self.transport.fetch_since(table, user_id, since).await?;

        let mut latest_observed: Option<Timestamp> = None;
        let mut applied = 0usize;

        for remote in &records {
            latest_observed = Some(match latest_observed {
                Some(latest) => latest.max(remote.updated_at),
                None => remote.updated_at,
            });

            let local = self.store.record(table, &remote.client_id).await?;
            match merge::apply(local.as_ref(), remote, table)? {
                Some(record) => {
                    self.store.put_record(record).await?;
                    applied += 1;
                }
                None => {
                    tracing::debug!(
                        table = %table,
                        client_id = %remote.client_id,
                        "kept pending local copy over remote value"
                    );
                }
            }
        }

        let next = watermark::after_pull(since, latest_observed, now_millis());
        self.store.set_watermark(table, next).await?;
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::{TransportError, TransportResult, UpsertAck};
    use async_trait::async_trait;
    use courier_engine::{LocalRecord, RemoteRecord, SyncStatus};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Transport returning scripted rows per table, with optional failures.
    #[derive(Default)]
    struct ScriptedTransport {
        rows: Mutex<std::collections::HashMap<String, Vec<RemoteRecord>>>,
        failing_tables: Mutex<Vec<String>>,
        requests: Mutex<Vec<(String, Option<Timestamp>)>>,
    }

    impl ScriptedTransport {
        fn with_rows(table: &str, rows: Vec<RemoteRecord>) -> Self {
            let transport = Self::default();
            transport.rows.lock().insert(table.to_string(), rows);
            transport
        }

        fn fail_table(&self, table: &str) {
            self.failing_tables.lock().push(table.to_string());
        }

        fn requests(&self) -> Vec<(String, Option<Timestamp>)> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl RemoteTransport for ScriptedTransport {
        async fn upsert(
            &self,
            _table: &str,
            _client_id: &str,
            _payload: &serde_json::Value,
        ) -> TransportResult<UpsertAck> {
            unreachable!("pull never upserts")
        }

        async fn upload(
            &self,
            _table: &str,
            _client_id: &str,
            _payload: &serde_json::Value,
        ) -> TransportResult<UpsertAck> {
            unreachable!("pull never uploads")
        }

        async fn fetch_since(
            &self,
            table: &str,
            _user_id: &str,
            since: Option<Timestamp>,
        ) -> TransportResult<Vec<RemoteRecord>> {
            self.requests.lock().push((table.to_string(), since));
            if self.failing_tables.lock().iter().any(|t| t == table) {
                return Err(TransportError::Unavailable);
            }
            Ok(self.rows.lock().get(table).cloned().unwrap_or_default())
        }
    }

    fn remote(client_id: &str, value: &str, updated_at: Timestamp) -> RemoteRecord {
        RemoteRecord {
            client_id: client_id.to_string(),
            server_id: format!("srv_{client_id}"),
            payload: json!({"value": value}),
            updated_at,
        }
    }

    #[tokio::test]
    async fn inserts_refreshes_and_keeps_pending() {
        let store = Arc::new(MemoryStore::new());

        // r_pending carries an unpushed local edit, r_synced is clean
        store
            .put_record(LocalRecord::new_local(
                "r_pending",
                "tasks",
                json!({"value": "v1"}),
                1000,
            ))
            .await
            .unwrap();
        store
            .put_record(LocalRecord::new_remote(
                "r_synced",
                "tasks",
                "srv_r_synced",
                json!({"value": "old"}),
                1000,
            ))
            .await
            .unwrap();

        let transport = Arc::new(ScriptedTransport::with_rows(
            "tasks",
            vec![
                remote("r_pending", "v2", 5000),
                remote("r_synced", "new", 6000),
                remote("r_new", "fresh", 7000),
            ],
        ));

        let engine = PullEngine::new(store.clone(), transport.clone());
        let outcome = engine.pull(&["tasks".to_string()], "user_1").await;
        assert!(outcome.success);
        assert!(outcome.error.is_none());

        // local pending edit survived
        let pending = store.record("tasks", "r_pending").await.unwrap().unwrap();
        assert_eq!(pending.payload, json!({"value": "v1"}));
        assert_eq!(pending.status, SyncStatus::Pending);

        // synced copy was refreshed
        let synced = store.record("tasks", "r_synced").await.unwrap().unwrap();
        assert_eq!(synced.payload, json!({"value": "new"}));
        assert_eq!(synced.status, SyncStatus::Synced);

        // unknown record was inserted as synced
        let inserted = store.record("tasks", "r_new").await.unwrap().unwrap();
        assert_eq!(inserted.status, SyncStatus::Synced);
        assert_eq!(inserted.server_id.as_deref(), Some("srv_r_new"));

        // watermark advanced to the latest observed updated_at
        assert_eq!(store.watermark("tasks").await.unwrap(), Some(7000));
    }

    #[tokio::test]
    async fn missing_watermark_requests_everything() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::with_rows("tasks", vec![]));

        let engine = PullEngine::new(store.clone(), transport.clone());
        assert!(engine.pull(&["tasks".to_string()], "user_1").await.success);

        assert_eq!(transport.requests(), vec![("tasks".to_string(), None)]);
        // even an empty first pull establishes a cursor
        assert!(store.watermark("tasks").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_pull_uses_the_stored_watermark() {
        let store = Arc::new(MemoryStore::new());
        store.set_watermark("tasks", 5000).await.unwrap();

        let transport = Arc::new(ScriptedTransport::with_rows(
            "tasks",
            vec![remote("r_1", "v", 6000)],
        ));

        let engine = PullEngine::new(store.clone(), transport.clone());
        assert!(engine.pull(&["tasks".to_string()], "user_1").await.success);

        assert_eq!(
            transport.requests(),
            vec![("tasks".to_string(), Some(5000))]
        );
        assert_eq!(store.watermark("tasks").await.unwrap(), Some(6000));
    }

    #[tokio::test]
    async fn watermark_never_decreases() {
        let store = Arc::new(MemoryStore::new());
        store.set_watermark("tasks", 9000).await.unwrap();

        // remote rows stamped before the stored watermark (clock skew)
        let transport = Arc::new(ScriptedTransport::with_rows(
            "tasks",
            vec![remote("r_1", "v", 4000)],
        ));

        let engine = PullEngine::new(store.clone(), transport.clone());
        assert!(engine.pull(&["tasks".to_string()], "user_1").await.success);
        assert_eq!(store.watermark("tasks").await.unwrap(), Some(9000));
    }

    #[tokio::test]
    async fn failed_table_keeps_watermark_and_others_proceed() {
        let store = Arc::new(MemoryStore::new());
        store.set_watermark("tasks", 5000).await.unwrap();

        let transport = Arc::new(ScriptedTransport::with_rows(
            "fieldResponses",
            vec![remote("r_1", "v", 6000)],
        ));
        transport.fail_table("tasks");

        let engine = PullEngine::new(store.clone(), transport.clone());
        let outcome = engine
            .pull(
                &["tasks".to_string(), "fieldResponses".to_string()],
                "user_1",
            )
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("tasks"));

        // failed table: watermark untouched
        assert_eq!(store.watermark("tasks").await.unwrap(), Some(5000));
        // healthy table in the same cycle still advanced
        assert_eq!(store.watermark("fieldResponses").await.unwrap(), Some(6000));
        assert!(store
            .record("fieldResponses", "r_1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn repeated_window_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(ScriptedTransport::with_rows(
            "tasks",
            vec![remote("r_1", "v", 6000)],
        ));

        let engine = PullEngine::new(store.clone(), transport.clone());
        assert!(engine.pull(&["tasks".to_string()], "user_1").await.success);
        let first = store.record("tasks", "r_1").await.unwrap().unwrap();

        // same rows delivered again (re-fetched window after a crash)
        assert!(engine.pull(&["tasks".to_string()], "user_1").await.success);
        let second = store.record("tasks", "r_1").await.unwrap().unwrap();
        assert_eq!(first, second);
    }
}
