//! Remote transport seam.
//!
//! The remote store is consumed through two capabilities: idempotent
//! upsert-by-client-id mutations that return the assigned server id, and
//! "all records of type T changed since timestamp X for identity Y"
//! queries. Whether the server answers those by polling or push is the
//! transport's business; the pull engine treats both as a fetch.

use async_trait::async_trait;
use courier_engine::{RemoteRecord, ServerId, Timestamp};
use serde::{Deserialize, Serialize};

/// Acknowledgment of an idempotent upsert or upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAck {
    /// Identifier assigned by the remote store (the storage id for uploads)
    pub server_id: ServerId,
}

/// Remote call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("service unavailable")]
    Unavailable,

    #[error("remote rejected the call: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether a retry on a later cycle can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) | TransportError::Timeout | TransportError::Unavailable => {
                true
            }
            TransportError::Rejected(_) => false,
        }
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Request/response RPC client against the authoritative remote store.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Apply a mutation remotely, keyed by client id.
    ///
    /// Must be idempotent: applying the same payload twice looks up the
    /// existing record by client id and updates it instead of inserting a
    /// duplicate.
    async fn upsert(
        &self,
        table: &str,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> TransportResult<UpsertAck>;

    /// Upload a blob payload. The ack carries the assigned storage id.
    /// Idempotent by client id, like [`upsert`](RemoteTransport::upsert).
    async fn upload(
        &self,
        table: &str,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> TransportResult<UpsertAck>;

    /// All records of `table` changed since `since` for the given identity.
    /// `None` means everything (initial sync).
    async fn fetch_since(
        &self,
        table: &str,
        user_id: &str,
        since: Option<Timestamp>,
    ) -> TransportResult<Vec<RemoteRecord>>;
}
