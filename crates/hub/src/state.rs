// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Hub state shared by every connection.
//!
//! Holds the push fanout channel and each connection's joined routes.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rideline_core::{PushTarget, ServerMessage};
use serde_json::Value;
use tokio::sync::{broadcast, watch};

/// Identifies one client connection.
pub type ConnectionId = u64;

/// Shared hub state. Cheap to clone.
#[derive(Clone)]
pub struct HubState {
    inner: Arc<HubStateInner>,
}

struct HubStateInner {
    /// Push messages on their way to every connection.
    broadcast_tx: broadcast::Sender<ServerMessage>,
    /// Routes each live connection has joined.
    routes: Mutex<HashMap<ConnectionId, BTreeSet<String>>>,
    next_connection: AtomicU64,
    /// Bumped to make every open connection close.
    kick_tx: watch::Sender<u64>,
}

impl HubState {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        let (kick_tx, _) = watch::channel(0);
        HubState {
            inner: Arc::new(HubStateInner {
                broadcast_tx,
                routes: Mutex::new(HashMap::new()),
                next_connection: AtomicU64::new(1),
                kick_tx,
            }),
        }
    }

    /// Pushes a record to connected clients.
    ///
    /// `VehicleQueueUpdate` goes only to connections that joined the record's
    /// `routeId`; every other target goes to everyone. Returns how many
    /// connections will receive it.
    pub fn publish(&self, target: impl Into<String>, payload: Value) -> usize {
        let message = ServerMessage::push(target, payload);
        let receivers = {
            let routes = self.routes();
            routes.values().filter(|joined| wants(joined, &message)).count()
        };
        // No receivers is not an error for a hub
        let _ = self.inner.broadcast_tx.send(message);
        receivers
    }

    /// Closes every open connection. Clients see a normal close.
    pub fn drop_connections(&self) {
        self.inner.kick_tx.send_modify(|generation| *generation += 1);
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.routes().len()
    }

    /// Number of connections that joined a route.
    pub fn route_subscribers(&self, route_id: &str) -> usize {
        self.routes()
            .values()
            .filter(|joined| joined.contains(route_id))
            .count()
    }

    pub(crate) fn open_connection(&self) -> Connection {
        let id = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        self.routes().insert(id, BTreeSet::new());
        Connection {
            id,
            pushes: self.inner.broadcast_tx.subscribe(),
            kicks: self.inner.kick_tx.subscribe(),
        }
    }

    pub(crate) fn close_connection(&self, id: ConnectionId) {
        self.routes().remove(&id);
    }

    pub(crate) fn join(&self, id: ConnectionId, route_id: &str) {
        if let Some(joined) = self.routes().get_mut(&id) {
            joined.insert(route_id.to_string());
        }
    }

    pub(crate) fn leave(&self, id: ConnectionId, route_id: &str) {
        if let Some(joined) = self.routes().get_mut(&id) {
            joined.remove(route_id);
        }
    }

    /// Returns true if the connection should see this push.
    pub(crate) fn delivers_to(&self, id: ConnectionId, message: &ServerMessage) -> bool {
        self.routes()
            .get(&id)
            .is_some_and(|joined| wants(joined, message))
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<ConnectionId, BTreeSet<String>>> {
        self.inner
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HubState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection feeds handed out by [`HubState`].
pub(crate) struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) pushes: broadcast::Receiver<ServerMessage>,
    pub(crate) kicks: watch::Receiver<u64>,
}

fn wants(joined: &BTreeSet<String>, message: &ServerMessage) -> bool {
    let ServerMessage::Push { target, payload } = message else {
        return false;
    };
    if PushTarget::parse(target) != Some(PushTarget::VehicleQueueUpdate) {
        return true;
    }
    payload
        .get("routeId")
        .and_then(Value::as_str)
        .is_some_and(|route| joined.contains(route))
}
