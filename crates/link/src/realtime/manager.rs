// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing handle to the push connection.

use std::sync::Arc;

use rideline_core::{
    Config, Error, RealtimeConnectionState, Result, TripStatusChange, VehiclePositionUpdate,
    VehicleQueueUpdate,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::actor::{Command, ConnectionActor};
use super::handlers::Registration;
use crate::connectivity::ConnectivityMonitor;
use crate::transport::{Transport, WebSocketTransport};

/// Owns one long-lived push connection.
///
/// Handles are cheap to clone and all drive the same connection. The
/// connection task is spawned on construction, so a Tokio runtime must be
/// running. It stops on [`dispose`](Self::dispose) or when the last handle is
/// dropped.
#[derive(Clone)]
pub struct RealtimeConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<RealtimeConnectionState>,
}

impl RealtimeConnectionManager {
    /// A manager speaking WebSocket to `config.hub_url()`.
    pub fn new(config: &Config, monitor: ConnectivityMonitor) -> Self {
        Self::with_transport(config, monitor, WebSocketTransport::new())
    }

    /// A manager over a caller-supplied transport.
    pub fn with_transport<T>(config: &Config, monitor: ConnectivityMonitor, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(RealtimeConnectionState::new());
        let actor = ConnectionActor::new(
            config.realtime.clone(),
            config.hub_url(),
            transport,
            monitor,
            command_rx,
            state_tx,
        );
        tokio::spawn(actor.run());

        RealtimeConnectionManager { commands, state }
    }

    /// Opens the connection. A no-op when already connected.
    ///
    /// Fails fast with [`Error::NetworkUnavailable`] while offline. Any other
    /// failure leaves the status `failed`; this call never retries on its own.
    pub async fn connect(&self) -> Result<()> {
        self.request(|reply| Command::Connect { reply }).await?
    }

    /// Closes the connection and cancels any scheduled reconnect.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.disconnect().await?;
        self.connect().await
    }

    /// Subscribes to queue updates for a route.
    ///
    /// The route is kept for replay on every later reconnect even when this
    /// call fails (e.g. with [`Error::NotConnected`]). Without a completion
    /// from the hub within the invocation timeout it fails with
    /// [`Error::Timeout`].
    pub async fn join_queue_updates(&self, route_id: impl Into<String>) -> Result<()> {
        let route_id = route_id.into();
        self.request(|reply| Command::Join { route_id, reply }).await?
    }

    /// Unsubscribes from a route. Succeeds locally while disconnected.
    pub async fn leave_queue_updates(&self, route_id: impl Into<String>) -> Result<()> {
        let route_id = route_id.into();
        self.request(|reply| Command::Leave { route_id, reply }).await?
    }

    /// Routes currently replayed on reconnect, sorted.
    pub async fn subscriptions(&self) -> Result<Vec<String>> {
        self.request(|reply| Command::Subscriptions { reply }).await
    }

    /// Adds a handler for route queue updates. Handlers for one record type
    /// run in registration order.
    pub fn on_vehicle_queue_update<F>(&self, handler: F)
    where
        F: Fn(&VehicleQueueUpdate) + Send + Sync + 'static,
    {
        self.register(Registration::VehicleQueueUpdate(Arc::new(handler)));
    }

    pub fn on_vehicle_position_update<F>(&self, handler: F)
    where
        F: Fn(&VehiclePositionUpdate) + Send + Sync + 'static,
    {
        self.register(Registration::VehiclePositionUpdate(Arc::new(handler)));
    }

    pub fn on_trip_status_change<F>(&self, handler: F)
    where
        F: Fn(&TripStatusChange) + Send + Sync + 'static,
    {
        self.register(Registration::TripStatusChange(Arc::new(handler)));
    }

    /// Stops liveness checks and pending reconnects; the link stays open.
    pub fn on_app_paused(&self) {
        self.send(Command::Pause);
    }

    /// Restarts liveness checks, or reconnects if the link dropped meanwhile.
    pub fn on_app_resumed(&self) {
        self.send(Command::Resume);
    }

    /// Latest connection state.
    pub fn state(&self) -> RealtimeConnectionState {
        self.state.borrow().clone()
    }

    /// Stream of connection states; closed once the manager is disposed.
    pub fn subscribe_state(&self) -> watch::Receiver<RealtimeConnectionState> {
        self.state.clone()
    }

    /// Tears the connection down for good. Safe to call repeatedly.
    pub async fn dispose(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Dispose { reply }).is_ok() {
            let _ = done.await;
        }
    }

    fn register(&self, registration: Registration) {
        self.send(Command::Register(registration));
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("ignoring request to a disposed connection manager");
        }
    }

    async fn request<R>(&self, command: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| Error::Disposed)?;
        response.await.map_err(|_| Error::Disposed)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
