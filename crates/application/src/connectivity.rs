//! Network reachability state and the active probe policy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, watch};
use tracing::{debug, warn};

use dolimirror_core::AppResult;

/// Latest-known network reachability.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityState {
    /// Whether the remote endpoint is believed reachable.
    pub is_online: bool,
    /// Whether an active probe is currently in flight.
    pub is_checking: bool,
    /// When reachability was last determined.
    pub last_check: Option<DateTime<Utc>>,
    /// Message of the last failed probe, if any.
    pub error: Option<String>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        // Assume reachability until a signal or probe says otherwise.
        Self {
            is_online: true,
            is_checking: false,
            last_check: None,
            error: None,
        }
    }
}

/// Port for the lightweight reachability probe.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Issues one probe request; `Ok(true)` means reachable.
    async fn check(&self) -> AppResult<bool>;
}

/// Tracks online/offline state from platform signals and active probes.
///
/// Exactly one monitor instance exists per running client; it is the only
/// writer of its state. Failed probes mark the monitor offline and record
/// the error without surfacing it to the caller.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    probe: Arc<dyn ConnectivityProbe>,
    state: RwLock<ConnectivityState>,
    online_tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor over the given probe, initially online.
    #[must_use]
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        let state = ConnectivityState::default();
        let (online_tx, _online_rx) = watch::channel(state.is_online);

        Self {
            inner: Arc::new(MonitorInner {
                probe,
                state: RwLock::new(state),
                online_tx,
            }),
        }
    }

    /// Returns the latest-known reachability without probing.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.inner.online_tx.borrow()
    }

    /// Returns a snapshot of the full connectivity state.
    pub async fn state(&self) -> ConnectivityState {
        self.inner.state.read().await.clone()
    }

    /// Subscribes to reachability changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.online_tx.subscribe()
    }

    /// Applies a passive platform connectivity signal immediately,
    /// without a probe.
    pub async fn set_online(&self, online: bool) {
        debug!(online, "passive connectivity transition");

        let mut state = self.inner.state.write().await;
        state.is_online = online;
        state.last_check = Some(Utc::now());
        state.error = None;
        drop(state);

        self.publish(online);
    }

    /// Runs one active probe and returns the resulting reachability.
    ///
    /// Probe failures are absorbed: they mark the monitor offline and
    /// record the error message instead of propagating.
    pub async fn check_now(&self) -> bool {
        {
            let mut state = self.inner.state.write().await;
            state.is_checking = true;
            state.error = None;
        }

        let outcome = self.inner.probe.check().await;

        let mut state = self.inner.state.write().await;
        state.is_checking = false;
        state.last_check = Some(Utc::now());

        let online = match outcome {
            Ok(reachable) => {
                state.error = None;
                reachable
            }
            Err(error) => {
                warn!(%error, "connectivity probe failed");
                state.error = Some(error.to_string());
                false
            }
        };
        state.is_online = online;
        drop(state);

        self.publish(online);
        online
    }

    fn publish(&self, online: bool) {
        self.inner.online_tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
    }
}
