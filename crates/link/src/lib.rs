// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rideline-link - Connectivity runtime for transit client apps.
//!
//! This crate keeps a device's view of the network honest and builds the
//! two network-dependent services on top of it.
//!
//! # Main Components
//!
//! - [`ConnectivityMonitor`] - Online/offline detection with a reachability probe
//! - [`RealtimeConnectionManager`] - Self-healing WebSocket push connection
//! - [`OfflineActionQueue`] - Durable queue of actions replayed when online
//! - [`storage`] - Key-value persistence for the queue
//! - [`transport`] - The wire seam between the manager and the hub
//!
//! # Startup
//!
//! ```rust,ignore
//! use rideline_link::{ConnectivityMonitor, FileStore, OfflineActionQueue, PlatformInterfaces};
//!
//! let config = Config::load(path)?;
//! let interfaces = Arc::new(PlatformInterfaces::new(ConnectionType::Wifi));
//! let monitor = ConnectivityMonitor::from_config(config.connectivity.clone(), interfaces);
//! monitor.initialize().await?;
//!
//! let realtime = RealtimeConnectionManager::new(&config, monitor.clone());
//! realtime.connect().await?;
//!
//! let store = Arc::new(FileStore::open(FileStore::default_location().unwrap_or_default())?);
//! let queue = OfflineActionQueue::new(config.queue.clone(), store, monitor.clone());
//! queue.initialize().await?;
//! ```

pub mod connectivity;
pub mod queue;
pub mod realtime;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use connectivity::{
    ConnectivityMonitor, InterfaceSource, PlatformInterfaces, Reachability, TcpReachability,
};
pub use queue::OfflineActionQueue;
pub use realtime::RealtimeConnectionManager;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{Transport, TransportError, TransportEvent, WebSocketTransport};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
