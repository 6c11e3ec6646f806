//! Orphan classification for locally cached work items.
//!
//! A work item is orphaned when its backing user, assignment, or template no
//! longer validly exists remotely. The device may never have pulled an
//! explicit deletion event for any of these, so the judgment is re-derived
//! from reference lookups on every read. Nothing is cached and no orphan
//! flag is stored: a template restored remotely un-orphans the item on the
//! next read with no special-case code.

use crate::{ClientId, UserId};
use serde::{Deserialize, Serialize};

/// A locally cached work item and the references it depends on.
///
/// Exactly one of `routine_task_id` / `standalone_task_id` is present on a
/// well-formed item; any other shape classifies as `TemplateRemoved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Client id of the work item record
    pub client_id: ClientId,
    /// Parent day/assignment the item was scheduled under
    pub assignment_id: String,
    /// User the item was created for
    pub user_id: UserId,
    /// Routine-scoped task template reference
    pub routine_task_id: Option<String>,
    /// Standalone task template reference
    pub standalone_task_id: Option<String>,
}

/// Why a work item is orphaned. Variants are listed in precedence order:
/// when several conditions hold at once, the earliest listed one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// The referenced user no longer resolves to any known user
    UserDeleted,
    /// The user resolves but is no longer linked to the parent assignment
    UserUnassigned,
    /// The referenced template no longer exists or was deactivated,
    /// or the item carries no usable template reference at all
    TemplateRemoved,
}

/// Read-time judgment for one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum Classification {
    /// All references still resolve
    Intact,
    /// At least one reference is gone; the highest-precedence reason wins
    Orphaned(OrphanReason),
}

impl Classification {
    pub fn is_orphaned(&self) -> bool {
        matches!(self, Classification::Orphaned(_))
    }

    pub fn reason(&self) -> Option<OrphanReason> {
        match self {
            Classification::Intact => None,
            Classification::Orphaned(reason) => Some(*reason),
        }
    }
}

/// Read access to the entities a work item references.
///
/// Implemented over the local cache, the remote store, or both; the
/// classifier does not care where the answers come from.
pub trait ReferenceLookup {
    /// Does the user id resolve to a known user?
    fn user_exists(&self, user_id: &str) -> bool;
    /// Is the user still linked to the parent assignment?
    fn user_assigned(&self, user_id: &str, assignment_id: &str) -> bool;
    /// Is the routine-scoped task template (and its routine) still active?
    fn routine_task_active(&self, task_id: &str) -> bool;
    /// Is the standalone task template still active?
    fn standalone_task_active(&self, task_id: &str) -> bool;
}

/// Classify one work item against the current reference state.
///
/// All conditions are evaluated in full, then resolved by fixed precedence:
/// `UserDeleted` > `UserUnassigned` > `TemplateRemoved`.
pub fn classify(item: &WorkItem, refs: &impl ReferenceLookup) -> Classification {
    let user_deleted = !refs.user_exists(&item.user_id);
    let user_unassigned = !refs.user_assigned(&item.user_id, &item.assignment_id);
    let template_removed = match (&item.routine_task_id, &item.standalone_task_id) {
        (Some(task_id), None) => !refs.routine_task_active(task_id),
        (None, Some(task_id)) => !refs.standalone_task_active(task_id),
        // neither reference (or an ill-formed both) leaves nothing to back
        // the item
        _ => true,
    };

    if user_deleted {
        Classification::Orphaned(OrphanReason::UserDeleted)
    } else if user_unassigned {
        Classification::Orphaned(OrphanReason::UserUnassigned)
    } else if template_removed {
        Classification::Orphaned(OrphanReason::TemplateRemoved)
    } else {
        Classification::Intact
    }
}

/// The work items whose references all still resolve.
///
/// Pure filter over [`classify`], recomputed on every call.
pub fn filter_intact<'a>(
    items: &'a [WorkItem],
    refs: &impl ReferenceLookup,
) -> Vec<&'a WorkItem> {
    items
        .iter()
        .filter(|item| !classify(item, refs).is_orphaned())
        .collect()
}

/// The orphaned work items, each with its winning reason.
///
/// Pure filter over [`classify`], recomputed on every call.
pub fn select_orphaned<'a>(
    items: &'a [WorkItem],
    refs: &impl ReferenceLookup,
) -> Vec<(&'a WorkItem, OrphanReason)> {
    items
        .iter()
        .filter_map(|item| match classify(item, refs) {
            Classification::Intact => None,
            Classification::Orphaned(reason) => Some((item, reason)),
        })
        .collect()
}
