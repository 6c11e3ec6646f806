//! Courier Client - async orchestration for local-first data sync.
//!
//! This crate wires the deterministic [`courier_engine`] core to the world:
//! a connectivity monitor, a durable mutation queue, push and pull engines,
//! and the process-wide sync orchestrator. The device database and the
//! remote RPC transport stay behind the [`LocalStore`] and
//! [`RemoteTransport`] traits.
//!
//! A local write lands in the local store immediately and is marked pending.
//! When online, the write path attempts an inline remote apply and falls
//! back to queuing on failure; offline writes queue directly. Each sync
//! cycle runs Push before Pull: queued local intent must reach the server
//! before remote reads are trusted to overwrite local caches.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod orchestrator;
pub mod pull;
pub mod push;
pub mod queue;
pub mod store;
pub mod transport;

pub use config::{ConfigError, SyncConfig};
pub use connectivity::{ConnectivityMonitor, ReachabilityProbe, SubscriptionId};
pub use error::{Result, SyncError};
pub use orchestrator::SyncOrchestrator;
pub use pull::{PullEngine, PullOutcome};
pub use push::{PushEngine, PushOutcome};
pub use queue::MutationQueue;
pub use store::{LocalStore, MemoryStore, StoreError};
pub use transport::{RemoteTransport, TransportError, UpsertAck};

/// Current wall-clock time in milliseconds since the epoch.
pub(crate) fn now_millis() -> courier_engine::Timestamp {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
