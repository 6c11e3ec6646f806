//! Observable sync status.
//!
//! The orchestrator is the single writer; everyone else receives immutable
//! snapshots. Each state change produces a fresh [`SyncSnapshot`] that is
//! broadcast to subscribers, never a value mutated in place while readers
//! may be looking at it.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Overall state of the sync lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No cycle in flight
    Idle,
    /// One push+pull cycle in flight
    Syncing,
    /// The last cycle failed; the message is retained until the next attempt
    Error,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Syncing => write!(f, "syncing"),
            SyncState::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time status snapshot broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    /// Current lane state
    pub state: SyncState,
    /// Outstanding queue entries (mirrors queue depth)
    pub pending_count: usize,
    /// Completion time of the last clean push+pull cycle
    pub last_synced_at: Option<Timestamp>,
    /// Message from the most recent failed cycle
    pub last_error: Option<String>,
}

impl SyncSnapshot {
    /// Initial status at process start. Not persisted across restarts.
    pub fn idle() -> Self {
        Self {
            state: SyncState::Idle,
            pending_count: 0,
            last_synced_at: None,
            last_error: None,
        }
    }

    /// Snapshot for a cycle that just started.
    pub fn syncing(&self) -> Self {
        Self {
            state: SyncState::Syncing,
            ..self.clone()
        }
    }

    /// Snapshot for a failed cycle. The message sticks until the next attempt.
    pub fn errored(&self, message: impl Into<String>) -> Self {
        Self {
            state: SyncState::Error,
            last_error: Some(message.into()),
            ..self.clone()
        }
    }

    /// Snapshot for a clean cycle: idle, fresh sync time, error cleared.
    pub fn completed(&self, at: Timestamp, pending_count: usize) -> Self {
        Self {
            state: SyncState::Idle,
            pending_count,
            last_synced_at: Some(at),
            last_error: None,
        }
    }

    /// Snapshot with a refreshed queue depth, state untouched.
    pub fn with_pending(&self, pending_count: usize) -> Self {
        Self {
            pending_count,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for SyncSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pending_count {
            0 => write!(f, "{}", self.state),
            n => write!(f, "{} ({} pending)", self.state, n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status() {
        let status = SyncSnapshot::idle();
        assert_eq!(status.state, SyncState::Idle);
        assert_eq!(status.pending_count, 0);
        assert!(status.last_synced_at.is_none());
        assert!(status.last_error.is_none());
    }

    #[test]
    fn cycle_transitions() {
        let idle = SyncSnapshot::idle().with_pending(3);

        let syncing = idle.syncing();
        assert_eq!(syncing.state, SyncState::Syncing);
        assert_eq!(syncing.pending_count, 3);

        let done = syncing.completed(9000, 0);
        assert_eq!(done.state, SyncState::Idle);
        assert_eq!(done.pending_count, 0);
        assert_eq!(done.last_synced_at, Some(9000));
    }

    #[test]
    fn error_message_sticks_until_next_clean_cycle() {
        let failed = SyncSnapshot::idle().syncing().errored("push failed");
        assert_eq!(failed.state, SyncState::Error);
        assert_eq!(failed.last_error.as_deref(), Some("push failed"));

        // the message survives the next cycle start...
        let retrying = failed.syncing();
        assert_eq!(retrying.last_error.as_deref(), Some("push failed"));

        // ...and clears on completion
        let done = retrying.completed(9000, 0);
        assert!(done.last_error.is_none());
    }

    #[test]
    fn display_for_ui() {
        assert_eq!(SyncSnapshot::idle().to_string(), "idle");
        assert_eq!(
            SyncSnapshot::idle().with_pending(3).syncing().to_string(),
            "syncing (3 pending)"
        );
    }

    #[test]
    fn serialization_roundtrip() {
        let status = SyncSnapshot::idle().syncing().errored("boom");
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"state\":\"error\""));
        assert!(json.contains("pendingCount")); // camelCase

        let parsed: SyncSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(status, parsed);
    }
}
