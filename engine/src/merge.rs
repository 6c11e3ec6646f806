//! Pull-side merge decisions.
//!
//! When a pull delivers a remote record, exactly one of three things happens:
//! a `Pending` local copy is kept untouched (the local edit has not had the
//! chance to be pushed, and overwriting it would silently discard user
//! input), a `Synced` local copy is refreshed with the remote values, or a
//! missing local copy is inserted as `Synced`. The decision is pure; the
//! orchestration layer performs the store writes.

use crate::{error::Result, ClientId, LocalRecord, ServerId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    /// The idempotency key the record was upserted under
    pub client_id: ClientId,
    /// Identifier assigned by the remote store
    pub server_id: ServerId,
    /// Current remote field values
    pub payload: serde_json::Value,
    /// Remote modification time (milliseconds since epoch)
    pub updated_at: Timestamp,
}

/// What to do with one incoming remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeDecision {
    /// Local copy is `Pending`; the remote value is ignored this cycle
    KeepLocal,
    /// Local copy is `Synced`; overwrite its fields with the remote values
    Refresh,
    /// No local copy; insert the remote record as `Synced`
    Insert,
}

/// Decide how an incoming remote record merges against the local copy.
pub fn decide(local: Option<&LocalRecord>) -> MergeDecision {
    match local {
        Some(record) if record.status.is_pending() => MergeDecision::KeepLocal,
        Some(_) => MergeDecision::Refresh,
        None => MergeDecision::Insert,
    }
}

/// Apply the merge decision, returning the record to write back.
///
/// `None` means the local copy must be left untouched.
pub fn apply(
    local: Option<&LocalRecord>,
    remote: &RemoteRecord,
    table: &str,
) -> Result<Option<LocalRecord>> {
    match (decide(local), local) {
        (MergeDecision::KeepLocal, _) => Ok(None),
        (MergeDecision::Refresh, Some(existing)) => {
            let mut record = existing.clone();
            record.refresh_from_remote(
                remote.server_id.clone(),
                remote.payload.clone(),
                remote.updated_at,
            )?;
            Ok(Some(record))
        }
        (MergeDecision::Insert, _) | (MergeDecision::Refresh, None) => {
            Ok(Some(LocalRecord::new_remote(
                remote.client_id.clone(),
                table,
                remote.server_id.clone(),
                remote.payload.clone(),
                remote.updated_at,
            )))
        }
    }
}
