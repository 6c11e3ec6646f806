//! Connectivity monitor.
//!
//! Observes the device's reachability through a [`ReachabilityProbe`] and
//! publishes online/offline **transitions** (not every probe result) to
//! subscribers. Absence of a network capability is treated as offline,
//! never as an error.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Platform reachability signal.
///
/// One check at a time; `false` covers both "no route" and "no network
/// capability at all".
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Handle identifying one subscriber.
pub type SubscriptionId = String;

/// Publishes online/offline transitions from a periodic reachability probe.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    interval: Duration,
    online: Arc<AtomicBool>,
    subscribers: Arc<DashMap<SubscriptionId, mpsc::UnboundedSender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    /// Create a monitor. Starts offline until the first probe.
    pub fn new(probe: Arc<dyn ReachabilityProbe>, interval: Duration) -> Self {
        Self {
            probe,
            interval,
            online: Arc::new(AtomicBool::new(false)),
            subscribers: Arc::new(DashMap::new()),
            task: Mutex::new(None),
        }
    }

    /// Begin observing: one immediate probe to establish the baseline, then
    /// periodic probing. Calling `start` on a running monitor is a no-op.
    pub async fn start(&self) {
        if self.task.lock().is_some() {
            return;
        }

        let initial = self.probe.probe().await;
        self.online.store(initial, Ordering::SeqCst);
        tracing::info!(online = initial, "connectivity monitor started");

        let probe = Arc::clone(&self.probe);
        let online = Arc::clone(&self.online);
        let subscribers = Arc::clone(&self.subscribers);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the immediate first tick duplicates the baseline probe
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = probe.probe().await;
                let previous = online.swap(now, Ordering::SeqCst);
                if previous != now {
                    tracing::info!(online = now, "connectivity transition");
                    subscribers.retain(|_, tx| tx.send(now).is_ok());
                }
            }
        });

        *self.task.lock() = Some(handle);
    }

    /// Release the observation. Safe to call more than once.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::debug!("connectivity monitor stopped");
        }
    }

    /// Last known reachability, synchronously.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register for transition notifications.
    ///
    /// The receiver yields the new state on every transition; nothing is
    /// delivered for repeated probes with the same result.
    pub fn subscribe(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(id.clone(), tx);
        tracing::debug!(subscription = %id, "connectivity subscriber registered");
        (id, rx)
    }

    /// Deregister a subscriber.
    pub fn unsubscribe(&self, id: &str) {
        self.subscribers.remove(id);
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
