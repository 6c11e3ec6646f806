//! Error types for the Courier engine.

use crate::{ClientId, TableName};
use thiserror::Error;

/// All possible errors from the Courier engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid payload snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("refresh would overwrite pending record: {0}")]
    PendingOverwrite(ClientId),

    #[error("unresolved reference: {table}/{client_id}")]
    UnresolvedReference {
        table: TableName,
        client_id: ClientId,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
