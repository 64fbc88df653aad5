// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The connectivity monitor.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rideline_core::{
    ConnectionState, ConnectionType, ConnectivityConfig, Error, NetworkQuality, Result,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::interfaces::InterfaceSource;
use super::reachability::{Reachability, TcpReachability};
use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Disposed,
}

struct Inner {
    config: ConnectivityConfig,
    interfaces: Arc<dyn InterfaceSource>,
    reachability: Arc<dyn Reachability>,
    /// Dropped on dispose, which closes every subscriber's stream.
    state_tx: Mutex<Option<watch::Sender<ConnectionState>>>,
    state_rx: watch::Receiver<ConnectionState>,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
}

/// Tracks whether the device can reach the internet, and how well.
///
/// Cheap to clone; clones share one snapshot. Subscribers always see the
/// latest published [`ConnectionState`] first, and a new snapshot is only
/// published when online status, interface or quality changes.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    pub fn new(
        config: ConnectivityConfig,
        interfaces: Arc<dyn InterfaceSource>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::unknown());
        ConnectivityMonitor {
            inner: Arc::new(Inner {
                config,
                interfaces,
                reachability,
                state_tx: Mutex::new(Some(state_tx)),
                state_rx,
                lifecycle: Mutex::new(Lifecycle::Created),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// A monitor probing the configured TCP endpoints.
    pub fn from_config(config: ConnectivityConfig, interfaces: Arc<dyn InterfaceSource>) -> Self {
        let reachability = Arc::new(TcpReachability::from_config(&config));
        Self::new(config, interfaces, reachability)
    }

    /// Runs one check, then starts following interface changes and
    /// re-checking periodically. Calling it again while running is a no-op.
    pub async fn initialize(&self) -> Result<ConnectionState> {
        {
            let mut lifecycle = lock(&self.inner.lifecycle);
            match *lifecycle {
                Lifecycle::Disposed => return Err(Error::Disposed),
                Lifecycle::Running => return Ok(self.current()),
                Lifecycle::Created => *lifecycle = Lifecycle::Running,
            }
        }

        // Subscribe before the first check so no report slips between them
        let changes = self.inner.interfaces.changes();
        let state = self.check_connectivity().await;
        tokio::spawn(self.clone().watch(changes));
        info!(%state, "connectivity monitor started");
        Ok(state)
    }

    /// Full check: interface lookup followed by a reachability probe.
    pub async fn check_connectivity(&self) -> ConnectionState {
        self.check_connectivity_with(false).await
    }

    /// Checks connectivity, optionally skipping the reachability probe.
    ///
    /// With `skip_quality` any present interface is reported online with good
    /// quality. The computed state is returned even after dispose, but it is
    /// only published while the monitor is live.
    pub async fn check_connectivity_with(&self, skip_quality: bool) -> ConnectionState {
        let kind = match self.inner.interfaces.current() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "interface lookup failed, assuming offline");
                ConnectionType::None
            }
        };

        let state = if !kind.is_present() {
            ConnectionState::offline(Utc::now())
        } else if skip_quality {
            ConnectionState::online(kind, NetworkQuality::Good, Utc::now())
        } else {
            match self.inner.reachability.probe().await {
                Some(latency) if latency <= self.inner.config.poor_latency() => {
                    ConnectionState::online(kind, NetworkQuality::Good, Utc::now())
                }
                Some(latency) => {
                    debug!(?latency, "probe slow, reporting poor quality");
                    ConnectionState::online(kind, NetworkQuality::Poor, Utc::now())
                }
                None => ConnectionState::unreachable(kind, Utc::now()),
            }
        };

        self.publish(state.clone());
        state
    }

    /// True if any probe endpoint answered.
    pub async fn test_internet_reachability(&self) -> bool {
        self.inner.reachability.probe().await.is_some()
    }

    /// Latest published snapshot.
    pub fn current(&self) -> ConnectionState {
        self.inner.state_rx.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.inner.state_rx.borrow().is_online()
    }

    /// Stream of snapshots. The receiver starts at the latest snapshot and
    /// reports closed once the monitor is disposed.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_rx.clone()
    }

    /// Stops the background task and closes the snapshot stream. Idempotent.
    pub fn dispose(&self) {
        {
            let mut lifecycle = lock(&self.inner.lifecycle);
            if *lifecycle == Lifecycle::Disposed {
                return;
            }
            *lifecycle = Lifecycle::Disposed;
        }
        self.inner.cancel.cancel();
        lock(&self.inner.state_tx).take();
        info!("connectivity monitor disposed");
    }

    /// Returns true if subscribers were notified.
    fn publish(&self, next: ConnectionState) -> bool {
        let guard = lock(&self.inner.state_tx);
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        let changed = tx.send_if_modified(|current| {
            let changed = !current.same_observation(&next);
            *current = next;
            changed
        });
        if changed {
            info!(state = %self.current(), "connectivity changed");
        }
        changed
    }

    async fn watch(self, mut changes: broadcast::Receiver<ConnectionType>) {
        let period = self.inner.config.recheck_interval();
        let mut recheck = interval_at(Instant::now() + period, period);
        recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut feed_open = true;

        loop {
            let interface_present = self.current().connection_type().is_present();
            tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                change = changes.recv(), if feed_open => match change {
                    Ok(kind) => {
                        debug!(interface = %kind, "interface report");
                        self.check_connectivity().await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "interface reports lagged, re-checking");
                        self.check_connectivity().await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("interface source closed, falling back to periodic checks");
                        feed_open = false;
                    }
                },
                _ = recheck.tick(), if interface_present => {
                    self.check_connectivity().await;
                }
            }
        }
        debug!("connectivity watcher stopped");
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
