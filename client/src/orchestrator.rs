//! Sync orchestrator - the process-wide coordinator.
//!
//! Owns the observable sync state, sequences push-then-pull, reacts to
//! connectivity transitions, runs the periodic timer, and exposes
//! subscribe/status to callers. Constructed once per process and shared as
//! an `Arc`; no module-level globals.
//!
//! Push runs before Pull on every cycle. Pulling first could merge remote
//! state that is stale relative to local edits into records about to be
//! pushed with newer values; because Pull already defers to `Pending`
//! records, pushing first means Pull's overwrite path is only reached for
//! records that are safe to refresh.

use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityMonitor, ReachabilityProbe, SubscriptionId};
use crate::error::Result;
use crate::now_millis;
use crate::pull::PullEngine;
use crate::push::PushEngine;
use crate::queue::MutationQueue;
use crate::store::LocalStore;
use crate::transport::RemoteTransport;
use courier_engine::{LocalRecord, OpKind, SyncSnapshot};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Process-wide sync coordinator.
///
/// At most one push+pull cycle runs at a time; callers invoking [`sync`]
/// while one is in flight get the current status back, not a queued second
/// run. [`destroy`] prevents future cycles but never aborts one in flight.
///
/// [`sync`]: SyncOrchestrator::sync
/// [`destroy`]: SyncOrchestrator::destroy
pub struct SyncOrchestrator {
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn RemoteTransport>,
    connectivity: Arc<ConnectivityMonitor>,
    queue: MutationQueue,
    push: PushEngine,
    pull: PullEngine,
    tables: Vec<String>,
    user_id: String,
    config: SyncConfig,
    status: RwLock<SyncSnapshot>,
    syncing: AtomicBool,
    subscribers: DashMap<SubscriptionId, mpsc::UnboundedSender<SyncSnapshot>>,
    connectivity_sub: Mutex<Option<SubscriptionId>>,
    shutdown: watch::Sender<bool>,
}

impl SyncOrchestrator {
    /// Build the coordinator for one identity over the given tables.
    pub fn new(
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn RemoteTransport>,
        probe: Arc<dyn ReachabilityProbe>,
        tables: Vec<String>,
        user_id: impl Into<String>,
        config: SyncConfig,
    ) -> Arc<Self> {
        let connectivity = Arc::new(ConnectivityMonitor::new(probe, config.probe_interval));
        let (shutdown, _) = watch::channel(false);

        Arc::new(Self {
            queue: MutationQueue::new(Arc::clone(&store)),
            push: PushEngine::new(
                Arc::clone(&store),
                Arc::clone(&transport),
                config.max_retries,
            ),
            pull: PullEngine::new(Arc::clone(&store), Arc::clone(&transport)),
            store,
            transport,
            connectivity,
            tables,
            user_id: user_id.into(),
            config,
            status: RwLock::new(SyncSnapshot::idle()),
            syncing: AtomicBool::new(false),
            subscribers: DashMap::new(),
            connectivity_sub: Mutex::new(None),
            shutdown,
        })
    }

    /// Start connectivity observation, the periodic timer, and - when
    /// currently online - one initial full sync.
    ///
    /// Takes an `Arc` receiver because the spawned tasks keep the
    /// coordinator alive until [`destroy`](SyncOrchestrator::destroy):
    /// `orchestrator.clone().initialize().await`.
    pub async fn initialize(self: Arc<Self>) {
        self.connectivity.start().await;

        // every offline -> online transition triggers exactly one sync
        let (sub_id, mut transitions) = self.connectivity.subscribe();
        *self.connectivity_sub.lock() = Some(sub_id);
        let this = Arc::clone(&self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    transition = transitions.recv() => match transition {
                        Some(true) => {
                            tracing::info!("connectivity restored; starting sync cycle");
                            this.sync().await;
                        }
                        Some(false) => {}
                        None => break,
                    },
                }
            }
        });

        // periodic trigger, active only while online
        let this = Arc::clone(&self);
        let mut shutdown = self.shutdown.subscribe();
        let interval = self.config.sync_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        if this.connectivity.is_online() {
                            this.sync().await;
                        }
                    }
                }
            }
        });

        if self.connectivity.is_online() {
            self.sync().await;
        }
    }

    /// Stop the timer and connectivity observation. An in-flight cycle is
    /// left to finish; only future cycles are prevented. Used on
    /// logout/teardown.
    pub fn destroy(&self) {
        let _ = self.shutdown.send(true);
        if let Some(id) = self.connectivity_sub.lock().take() {
            self.connectivity.unsubscribe(&id);
        }
        self.connectivity.stop();
        tracing::info!("sync orchestrator destroyed");
    }

    /// One push-then-pull cycle. Never returns an error: the outcome lands
    /// in the status snapshot. Re-entrant calls while a cycle is in flight
    /// are no-ops returning the current status. The manual "sync now"
    /// trigger and the periodic timer both land here.
    pub async fn sync(&self) -> SyncSnapshot {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync cycle already in flight; skipping");
            return self.status();
        }

        let snapshot = self.run_cycle().await;
        self.syncing.store(false, Ordering::SeqCst);
        snapshot
    }

    async fn run_cycle(&self) -> SyncSnapshot {
        self.set_status(|current| current.syncing());

        let push = self.push.push().await;
        if !push.success {
            let message = push.errors.join("; ");
            tracing::warn!(errors = push.errors.len(), "push phase failed");
            return self.set_status(|current| current.errored(message));
        }

        let pull = self.pull.pull(&self.tables, &self.user_id).await;
        if !pull.success {
            let message = pull.error.unwrap_or_else(|| "pull failed".to_string());
            tracing::warn!(error = %message, "pull phase failed");
            return self.set_status(|current| current.errored(message));
        }

        let pending = self.queue.count().await.unwrap_or(0);
        tracing::info!(pending, "sync cycle complete");
        self.set_status(|current| current.completed(now_millis(), pending))
    }

    /// Current status, synchronously.
    pub fn status(&self) -> SyncSnapshot {
        self.status.read().clone()
    }

    /// Last known connectivity, for callers branching on it.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Register a status listener. The current status is delivered
    /// immediately, then every change.
    pub fn subscribe(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<SyncSnapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(self.status());
        let id = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(id.clone(), tx);
        (id, rx)
    }

    /// Deregister a status listener.
    pub fn unsubscribe(&self, id: &str) {
        self.subscribers.remove(id);
    }

    /// Apply a local mutation: write-through to the local store (the record
    /// becomes `Pending`), then either an inline remote apply when online or
    /// a queued one.
    ///
    /// A queue write failure is returned to the caller but the local
    /// mutation stands - the record is already in the store.
    pub async fn apply_local(
        &self,
        table: &str,
        op: OpKind,
        client_id: &str,
        payload: serde_json::Value,
    ) -> Result<LocalRecord> {
        let now = now_millis();
        let mut record = match self.store.record(table, client_id).await? {
            Some(mut existing) => {
                existing.apply_mutation(payload.clone(), now);
                existing
            }
            None => LocalRecord::new_local(client_id, table, payload.clone(), now),
        };
        self.store.put_record(record.clone()).await?;

        if self.connectivity.is_online() {
            let attempt = match op {
                OpKind::Create | OpKind::Update => {
                    self.transport.upsert(table, client_id, &payload).await
                }
                OpKind::Upload => self.transport.upload(table, client_id, &payload).await,
            };
            match attempt {
                Ok(ack) => {
                    record.mark_synced(Some(ack.server_id));
                    self.store.put_record(record.clone()).await?;
                    tracing::debug!(table, client_id, "mutation applied inline");
                    return Ok(record);
                }
                Err(e) => {
                    tracing::warn!(table, client_id, error = %e, "inline apply failed; queueing");
                }
            }
        }

        self.queue.enqueue(table, op, client_id, &payload).await?;
        self.refresh_pending_count().await;
        Ok(record)
    }

    /// Drop every queued mutation. Local data reset / logout only.
    pub async fn clear_pending(&self) -> Result<()> {
        self.queue.clear().await?;
        self.refresh_pending_count().await;
        Ok(())
    }

    async fn refresh_pending_count(&self) {
        if let Ok(pending) = self.queue.count().await {
            if self.status.read().pending_count != pending {
                self.set_status(|current| current.with_pending(pending));
            }
        }
    }

    /// Swap in a new status snapshot and broadcast it. The snapshot is
    /// cloned per subscriber; the stored value is never mutated in place.
    fn set_status(&self, next: impl FnOnce(&SyncSnapshot) -> SyncSnapshot) -> SyncSnapshot {
        let snapshot = {
            let mut status = self.status.write();
            let snapshot = next(&status);
            *status = snapshot.clone();
            snapshot
        };
        self.subscribers
            .retain(|_, tx| tx.send(snapshot.clone()).is_ok());
        snapshot
    }
}
