//! Watermark arithmetic for incremental pulls.
//!
//! Each table keeps one persisted watermark: the cursor used to request only
//! remote changes "since" that point. A missing watermark means "pull
//! everything" (first run), which is distinct from a present-but-stale one.

use crate::Timestamp;

/// Advance a stored watermark. Monotonic: never moves backwards.
pub fn advance(current: Option<Timestamp>, candidate: Timestamp) -> Timestamp {
    match current {
        Some(stored) => stored.max(candidate),
        None => candidate,
    }
}

/// Watermark to store after a table's pull completed without error.
///
/// Advances to the latest remote `updated_at` observed in the fetch. An
/// empty fetch advances to `now` instead, so the first sync of an empty
/// table still establishes a cursor.
pub fn after_pull(
    current: Option<Timestamp>,
    latest_observed: Option<Timestamp>,
    now: Timestamp,
) -> Timestamp {
    advance(current, latest_observed.unwrap_or(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pull_takes_candidate() {
        assert_eq!(advance(None, 5000), 5000);
    }

    #[test]
    fn advance_moves_forward() {
        assert_eq!(advance(Some(5000), 8000), 8000);
    }

    #[test]
    fn advance_never_moves_backwards() {
        assert_eq!(advance(Some(8000), 5000), 8000);
    }

    #[test]
    fn after_pull_uses_latest_observed() {
        assert_eq!(after_pull(Some(5000), Some(7000), 9000), 7000);
    }

    #[test]
    fn after_pull_empty_fetch_uses_now() {
        assert_eq!(after_pull(None, None, 9000), 9000);
    }

    #[test]
    fn after_pull_stays_monotonic_against_stale_remote_clocks() {
        // remote rows stamped before the stored watermark must not rewind it
        assert_eq!(after_pull(Some(8000), Some(6000), 9000), 8000);
    }
}
