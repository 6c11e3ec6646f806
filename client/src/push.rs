//! Push engine - drains the mutation queue against the remote store.
//!
//! Entries are attempted in creation order. A single failing entry never
//! blocks the rest of the queue, and nothing is dropped silently: entries
//! past the retry ceiling stay queued and are reported every cycle until an
//! external action clears them.

use crate::error::Result;
use crate::queue::MutationQueue;
use crate::store::LocalStore;
use crate::transport::{RemoteTransport, UpsertAck};
use courier_engine::{Error as EngineError, OpKind, QueueEntry};
use std::sync::Arc;

/// Result of one push pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// True only if no entry produced an error this cycle
    pub success: bool,
    /// One message per failed, skipped, or dropped entry
    pub errors: Vec<String>,
}

/// Drains queued mutations to the remote store with per-entry retry
/// accounting.
pub struct PushEngine {
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn RemoteTransport>,
    queue: MutationQueue,
    max_retries: u32,
}

impl PushEngine {
    pub fn new(
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn RemoteTransport>,
        max_retries: u32,
    ) -> Self {
        Self {
            queue: MutationQueue::new(Arc::clone(&store)),
            store,
            transport,
            max_retries,
        }
    }

    /// One push pass over the queue as it was at cycle start.
    pub async fn push(&self) -> PushOutcome {
        let entries = match self.queue.list_pending().await {
            Ok(entries) => entries,
            Err(e) => {
                return PushOutcome {
                    success: false,
                    errors: vec![format!("failed to read queue: {e}")],
                }
            }
        };

        let mut errors = Vec::new();
        for entry in entries {
            if entry.is_exhausted(self.max_retries) {
                // terminal but not silent: the entry stays queued and visible
                errors.push(format!(
                    "entry {} ({} {}/{}) exceeded {} attempts and was skipped",
                    entry.entry_id, entry.op, entry.table, entry.client_id, self.max_retries
                ));
                continue;
            }

            let payload = match entry.payload() {
                Ok(payload) => payload,
                Err(e) => {
                    // a corrupt snapshot can never succeed; drop it instead
                    // of requeueing it forever
                    tracing::error!(
                        entry_id = %entry.entry_id,
                        error = %e,
                        "dropping undeserializable queue entry"
                    );
                    errors.push(format!("entry {}: {e}", entry.entry_id));
                    if let Err(remove_err) = self.queue.remove(&entry.entry_id).await {
                        errors.push(format!("entry {}: {remove_err}", entry.entry_id));
                    }
                    continue;
                }
            };

            let attempt = match entry.op {
                OpKind::Create | OpKind::Update => {
                    self.transport
                        .upsert(&entry.table, &entry.client_id, &payload)
                        .await
                }
                OpKind::Upload => {
                    self.transport
                        .upload(&entry.table, &entry.client_id, &payload)
                        .await
                }
            };

            match attempt {
                Ok(ack) => {
                    if let Err(e) = self.acknowledge(&entry, ack).await {
                        errors.push(format!("entry {}: {e}", entry.entry_id));
                    }
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(
                            entry_id = %entry.entry_id,
                            table = %entry.table,
                            retry = entry.retry_count + 1,
                            error = %e,
                            "push attempt failed"
                        );
                    } else {
                        tracing::error!(
                            entry_id = %entry.entry_id,
                            table = %entry.table,
                            error = %e,
                            "push attempt rejected"
                        );
                    }
                    errors.push(format!(
                        "entry {} ({} {}/{}): {e}",
                        entry.entry_id, entry.op, entry.table, entry.client_id
                    ));
                    if let Err(bump_err) = self.queue.increment_retry(&entry.entry_id).await {
                        errors.push(format!("entry {}: {bump_err}", entry.entry_id));
                    }
                }
            }
        }

        PushOutcome {
            success: errors.is_empty(),
            errors,
        }
    }

    /// Finish one confirmed remote apply: mark the local record synced with
    /// its server id, then dequeue the entry. Nothing here ever touches a
    /// record's pending edits beyond the status flip the ack confirms.
    async fn acknowledge(&self, entry: &QueueEntry, ack: UpsertAck) -> Result<()> {
        match self.store.record(&entry.table, &entry.client_id).await? {
            Some(mut record) => {
                record.mark_synced(Some(ack.server_id));
                self.store.put_record(record).await?;
                self.queue.remove(&entry.entry_id).await?;
                tracing::debug!(
                    entry_id = %entry.entry_id,
                    table = %entry.table,
                    client_id = %entry.client_id,
                    "mutation confirmed remotely"
                );
                Ok(())
            }
            None => {
                // the target record no longer resolves locally; replaying the
                // entry cannot fix that, so surface it instead of retrying
                self.queue.remove(&entry.entry_id).await?;
                Err(EngineError::UnresolvedReference {
                    table: entry.table.clone(),
                    client_id: entry.client_id.clone(),
                }
                .into())
            }
        }
    }
}
