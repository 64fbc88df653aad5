// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for link tests.

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rideline_core::{ConnectionType, ConnectivityConfig, Error, Result};
use tokio::sync::broadcast;

use crate::connectivity::{ConnectivityMonitor, InterfaceSource, PlatformInterfaces, Reachability};
use crate::storage::{KeyValueStore, MemoryStore, StoreFuture};

/// Reachability probe whose answer the test controls.
pub struct ScriptedProbe {
    latency: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(latency: Option<Duration>) -> Self {
        ScriptedProbe {
            latency: Mutex::new(latency),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reachability for ScriptedProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Option<Duration>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        Box::pin(async move { latency })
    }
}

/// Interface source whose lookup always fails.
pub struct BrokenInterfaces {
    tx: broadcast::Sender<ConnectionType>,
}

impl BrokenInterfaces {
    pub fn new() -> Self {
        BrokenInterfaces {
            tx: broadcast::channel(4).0,
        }
    }
}

impl InterfaceSource for BrokenInterfaces {
    fn current(&self) -> Result<ConnectionType> {
        Err(Error::Io(std::io::Error::other("netlink unavailable")))
    }

    fn changes(&self) -> broadcast::Receiver<ConnectionType> {
        self.tx.subscribe()
    }
}

/// In-memory store whose next writes can be made to fail.
#[derive(Clone)]
pub struct FlakyStore {
    pub memory: MemoryStore,
    failures: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        FlakyStore {
            memory: MemoryStore::new(),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails the next `n` writes.
    pub fn fail_writes(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Option<String>> {
        self.memory.get(key)
    }

    fn set(&self, key: &str, value: String) -> StoreFuture<'_, ()> {
        if self.take_failure() {
            return Box::pin(async { Err(Error::Storage("disk full".to_string())) });
        }
        self.memory.set(key, value)
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, ()> {
        self.memory.remove(key)
    }
}

pub const FAST: Duration = Duration::from_millis(20);

/// A monitor wired to a scripted interface feed and probe.
pub struct Network {
    pub interfaces: Arc<PlatformInterfaces>,
    pub probe: Arc<ScriptedProbe>,
    pub monitor: ConnectivityMonitor,
}

impl Network {
    pub fn new(kind: ConnectionType, latency: Option<Duration>) -> Self {
        let interfaces = Arc::new(PlatformInterfaces::new(kind));
        let probe = Arc::new(ScriptedProbe::new(latency));
        let monitor = ConnectivityMonitor::new(
            ConnectivityConfig::default(),
            Arc::clone(&interfaces) as Arc<dyn InterfaceSource>,
            Arc::clone(&probe) as Arc<dyn Reachability>,
        );
        Network {
            interfaces,
            probe,
            monitor,
        }
    }

    /// A checked monitor reporting online over wifi.
    pub async fn online() -> Self {
        let network = Self::new(ConnectionType::Wifi, Some(FAST));
        network.monitor.check_connectivity().await;
        network
    }

    /// A checked monitor reporting offline.
    pub async fn offline() -> Self {
        let network = Self::new(ConnectionType::None, Some(FAST));
        network.monitor.check_connectivity().await;
        network
    }

    /// Drop the interface and publish the result.
    pub async fn go_offline(&self) {
        self.interfaces.report(ConnectionType::None);
        self.monitor.check_connectivity().await;
    }

    /// Bring wifi back and publish the result.
    pub async fn go_online(&self) {
        self.probe.set(Some(FAST));
        self.interfaces.report(ConnectionType::Wifi);
        self.monitor.check_connectivity().await;
    }
}
