//! # Courier Engine
//!
//! The deterministic core of a local-first synchronization engine.
//!
//! This crate provides the pure logic for keeping an on-device store
//! consistent with an authoritative remote store under intermittent
//! connectivity: record sync status, durable queue entries, pull-side merge
//! decisions, watermark arithmetic, and orphan classification.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: timestamps are passed in, never read from a clock
//! - **Testable**: pure logic, no mocks needed
//! - **Portable**: runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! Every synchronizable record is keyed by a **client id** generated on the
//! device at creation time. A **server id** appears only once the remote
//! store has acknowledged the record. The [`SyncStatus`] flag governs merge
//! behavior: a `Pending` record holds local mutations the remote store has
//! not confirmed, and an incoming pull never overwrites it.
//!
//! ### Queue Entries
//!
//! A [`QueueEntry`] is one outstanding intent to apply a mutation remotely.
//! Entries carry a self-contained payload snapshot taken at enqueue time and
//! a retry counter, and order by `(created_at, entry_id)` so a create always
//! drains before a later update of the same record.
//!
//! ### Merge Decisions
//!
//! [`merge::decide`] is the pull-side policy: local-wins-while-pending,
//! refresh when synced, insert when absent. The orchestration layer applies
//! the decision; the policy itself stays pure.
//!
//! ### Orphans
//!
//! [`orphan::classify`] re-derives, at read time, whether a cached work item
//! still has a valid backing user, assignment, and template remotely. No
//! orphan flag is ever stored, so a template restored remotely un-orphans
//! the item on the next read.
//!
//! ## Quick Start
//!
//! ```rust
//! use courier_engine::{merge, LocalRecord, MergeDecision, SyncStatus};
//! use serde_json::json;
//!
//! // A local edit awaiting push...
//! let record = LocalRecord::new_local(
//!     "resp_1",
//!     "fieldResponses",
//!     json!({"value": "42"}),
//!     1706745600000,
//! );
//! assert_eq!(record.status, SyncStatus::Pending);
//!
//! // ...is never overwritten by an incoming remote read.
//! assert_eq!(merge::decide(Some(&record)), MergeDecision::KeepLocal);
//! ```

pub mod entry;
pub mod error;
pub mod merge;
pub mod orphan;
pub mod record;
pub mod status;
pub mod watermark;

// Re-export main types at crate root
pub use entry::{OpKind, QueueEntry};
pub use error::Error;
pub use merge::{decide, MergeDecision, RemoteRecord};
pub use orphan::{
    classify, filter_intact, select_orphaned, Classification, OrphanReason, ReferenceLookup,
    WorkItem,
};
pub use record::{LocalRecord, SyncStatus};
pub use status::{SyncSnapshot, SyncState};

/// Type aliases for clarity
pub type ClientId = String;
pub type ServerId = String;
pub type EntryId = String;
pub type TableName = String;
pub type UserId = String;
pub type Timestamp = u64;
