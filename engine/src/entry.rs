//! Queue entry types for outstanding remote mutations.
//!
//! A queue entry is one durable intent to apply a local mutation remotely.
//! The payload is snapshotted at enqueue time so a later retry replays
//! exactly what the user wrote, independent of in-memory state.

use crate::{error::Result, ClientId, EntryId, Error, TableName, Timestamp};
use serde::{Deserialize, Serialize};

/// Kind of mutation to replay against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Create,
    Update,
    Upload,
}

impl OpKind {
    /// String form used in logs and stored rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Upload => "upload",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outstanding intent to apply a mutation remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Queue-local identifier, independent of the record's client id
    pub entry_id: EntryId,
    /// Table the mutation targets
    pub table: TableName,
    /// Operation kind
    pub op: OpKind,
    /// Client id of the target record
    pub client_id: ClientId,
    /// Serialized payload snapshot taken at enqueue time; self-contained
    pub snapshot: String,
    /// When the entry was enqueued (milliseconds since epoch)
    pub created_at: Timestamp,
    /// Failed attempts so far; never reset
    pub retry_count: u32,
}

impl QueueEntry {
    /// Create a new entry with a retry counter of zero, snapshotting the
    /// payload as it is right now.
    pub fn new(
        entry_id: impl Into<EntryId>,
        table: impl Into<TableName>,
        op: OpKind,
        client_id: impl Into<ClientId>,
        payload: &serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            table: table.into(),
            op,
            client_id: client_id.into(),
            snapshot: payload.to_string(),
            created_at,
            retry_count: 0,
        }
    }

    /// Deserialize the payload snapshot for replay.
    pub fn payload(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.snapshot).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Whether the entry has hit the retry ceiling and must be skipped
    /// (but never silently dropped).
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }

    /// Count one failed attempt.
    pub fn record_failure(&mut self) {
        self.retry_count += 1;
    }
}

/// Entries drain in creation-time order so a create pushes before a later
/// update of the same record. Ties break on entry id for determinism.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.created_at.cmp(&other.created_at) {
            std::cmp::Ordering::Equal => self.entry_id.cmp(&other.entry_id),
            other => other,
        }
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for QueueEntry {}
