//! Unified error handling for the client.

use crate::store::StoreError;
use crate::transport::TransportError;

/// Client-side sync error.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("engine error: {0}")]
    Engine(#[from] courier_engine::Error),

    #[error("local store error: {0}")]
    Store(#[from] StoreError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;
