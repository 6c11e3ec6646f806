//! Local record types and sync status.

use crate::{error::Result, ClientId, Error, ServerId, TableName, Timestamp};
use serde::{Deserialize, Serialize};

/// Sync status of a local record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local mutations not yet confirmed accepted by the remote store
    Pending,
    /// Known to match (or be derived from) the remote copy as of the last sync
    Synced,
}

impl SyncStatus {
    /// Check whether the record still holds unconfirmed local mutations.
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncStatus::Pending)
    }
}

/// A record in the on-device store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    /// Device-generated identifier, stable for the record's lifetime
    pub client_id: ClientId,
    /// Table this record belongs to
    pub table: TableName,
    /// Assigned by the remote store once the record is first accepted there
    pub server_id: Option<ServerId>,
    /// The actual data payload (JSON value)
    pub payload: serde_json::Value,
    /// Whether local mutations are awaiting remote confirmation
    pub status: SyncStatus,
    /// When the record was first created (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the record was last updated (milliseconds since epoch)
    pub updated_at: Timestamp,
}

impl LocalRecord {
    /// Create a record for a local write. Starts `Pending` with no server id.
    pub fn new_local(
        client_id: impl Into<ClientId>,
        table: impl Into<TableName>,
        payload: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            table: table.into(),
            server_id: None,
            payload,
            status: SyncStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Create a record from a remote read. Starts `Synced`.
    pub fn new_remote(
        client_id: impl Into<ClientId>,
        table: impl Into<TableName>,
        server_id: impl Into<ServerId>,
        payload: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            table: table.into(),
            server_id: Some(server_id.into()),
            payload,
            status: SyncStatus::Synced,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Apply a new local mutation. The record becomes `Pending` until the
    /// remote store confirms it.
    pub fn apply_mutation(&mut self, payload: serde_json::Value, timestamp: Timestamp) {
        self.payload = payload;
        self.status = SyncStatus::Pending;
        self.updated_at = timestamp;
    }

    /// Mark the record confirmed by the remote store. Sets the server id if
    /// one was returned; an existing server id is never cleared.
    pub fn mark_synced(&mut self, server_id: Option<ServerId>) {
        if let Some(id) = server_id {
            self.server_id = Some(id);
        }
        self.status = SyncStatus::Synced;
    }

    /// Overwrite this record with remote values during a pull.
    ///
    /// Only legal on a `Synced` record: a `Pending` record holds local edits
    /// that have not had the chance to be pushed.
    pub fn refresh_from_remote(
        &mut self,
        server_id: impl Into<ServerId>,
        payload: serde_json::Value,
        updated_at: Timestamp,
    ) -> Result<()> {
        if self.status.is_pending() {
            return Err(Error::PendingOverwrite(self.client_id.clone()));
        }
        self.server_id = Some(server_id.into());
        self.payload = payload;
        self.updated_at = updated_at;
        self.status = SyncStatus::Synced;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn local_record_starts_pending() {
        let record = LocalRecord::new_local("resp_1", "fieldResponses", json!({"v": 1}), 1000);

        assert_eq!(record.client_id, "resp_1");
        assert_eq!(record.table, "fieldResponses");
        assert_eq!(record.status, SyncStatus::Pending);
        assert!(record.server_id.is_none());
        assert!(record.status.is_pending());
    }

    #[test]
    fn remote_record_starts_synced() {
        let record =
            LocalRecord::new_remote("resp_1", "fieldResponses", "srv_9", json!({"v": 1}), 1000);

        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.server_id.as_deref(), Some("srv_9"));
    }

    #[test]
    fn mutation_makes_synced_record_pending() {
        let mut record =
            LocalRecord::new_remote("resp_1", "fieldResponses", "srv_9", json!({"v": 1}), 1000);

        record.apply_mutation(json!({"v": 2}), 2000);

        assert_eq!(record.status, SyncStatus::Pending);
        assert_eq!(record.payload, json!({"v": 2}));
        assert_eq!(record.updated_at, 2000);
        // server id survives local edits
        assert_eq!(record.server_id.as_deref(), Some("srv_9"));
    }

    #[test]
    fn mark_synced_sets_server_id_once() {
        let mut record = LocalRecord::new_local("resp_1", "fieldResponses", json!({"v": 1}), 1000);

        record.mark_synced(Some("srv_9".into()));
        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.server_id.as_deref(), Some("srv_9"));

        // an ack without a server id keeps the existing one
        record.apply_mutation(json!({"v": 2}), 2000);
        record.mark_synced(None);
        assert_eq!(record.server_id.as_deref(), Some("srv_9"));
        assert_eq!(record.status, SyncStatus::Synced);
    }

    #[test]
    fn refresh_overwrites_synced_record() {
        let mut record =
            LocalRecord::new_remote("resp_1", "fieldResponses", "srv_9", json!({"v": 1}), 1000);

        record
            .refresh_from_remote("srv_9", json!({"v": 3}), 3000)
            .unwrap();

        assert_eq!(record.payload, json!({"v": 3}));
        assert_eq!(record.updated_at, 3000);
        assert_eq!(record.status, SyncStatus::Synced);
    }

    #[test]
    fn refresh_rejected_on_pending_record() {
        let mut record = LocalRecord::new_local("resp_1", "fieldResponses", json!({"v": 1}), 1000);

        let result = record.refresh_from_remote("srv_9", json!({"v": 3}), 3000);

        assert!(matches!(result, Err(Error::PendingOverwrite(_))));
        assert_eq!(record.payload, json!({"v": 1}));
        assert_eq!(record.status, SyncStatus::Pending);
    }

    #[test]
    fn serialization_roundtrip() {
        let record =
            LocalRecord::new_remote("resp_1", "fieldResponses", "srv_9", json!({"v": 1}), 1000);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("clientId")); // camelCase
        assert!(json.contains("\"status\":\"synced\""));

        let parsed: LocalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, parsed);
    }
}
