// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The task that owns the push connection.
//!
//! Every piece of connection state lives here and is touched by this task
//! only. Callers talk to it through [`Command`]s; the event loop multiplexes
//! commands, transport events, connectivity changes and the timers, so at
//! most one connect attempt and one reconnect timer ever exist.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use chrono::Utc;
use rideline_core::{
    Backoff, ClientMessage, ConnectionState, Error, PushMessage, RealtimeConfig,
    RealtimeConnectionState, RealtimeStatus, Result, ServerMessage,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep_until, timeout, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::handlers::{PushHandlers, Registration};
use crate::connectivity::ConnectivityMonitor;
use crate::transport::{Transport, TransportError, TransportEvent, TransportResult};

/// Requests from manager handles.
pub(crate) enum Command {
    Connect {
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Join {
        route_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Leave {
        route_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Register(Registration),
    Subscriptions {
        reply: oneshot::Sender<Vec<String>>,
    },
    Pause,
    Resume,
    Dispose {
        reply: oneshot::Sender<()>,
    },
}

/// Whether the caller currently wants a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Idle,
    Online,
}

/// An invocation waiting for its completion.
enum Pending {
    Caller {
        reply: oneshot::Sender<Result<()>>,
        label: String,
        deadline: Instant,
    },
    Replay(String),
    Ping,
}

enum Wake {
    Command(Option<Command>),
    Network(bool),
    Transport(TransportResult<TransportEvent>),
    InvocationTimeout,
    PingTimeout,
    ServerTimeout,
    Heartbeat,
    KeepAlive,
    Reconnect,
}

pub(crate) struct ConnectionActor<T> {
    config: RealtimeConfig,
    backoff: Backoff,
    url: String,
    transport: T,
    monitor: ConnectivityMonitor,
    network: Option<watch::Receiver<ConnectionState>>,
    was_online: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<RealtimeConnectionState>,
    handlers: PushHandlers,
    subscriptions: BTreeSet<String>,
    pending: HashMap<u64, Pending>,
    next_id: u64,
    intent: Intent,
    /// The transport link is up (or re-establishing itself).
    link_open: bool,
    paused: bool,
    heartbeat: Option<Interval>,
    keep_alive: Option<Interval>,
    ping_deadline: Option<Instant>,
    idle_deadline: Option<Instant>,
    reconnect_at: Option<Instant>,
}

impl<T: Transport> ConnectionActor<T> {
    pub(crate) fn new(
        config: RealtimeConfig,
        url: String,
        transport: T,
        monitor: ConnectivityMonitor,
        commands: mpsc::UnboundedReceiver<Command>,
        state: watch::Sender<RealtimeConnectionState>,
    ) -> Self {
        let network = monitor.subscribe();
        let was_online = network.borrow().is_online();
        ConnectionActor {
            backoff: config.backoff(),
            config,
            url,
            transport,
            monitor,
            network: Some(network),
            was_online,
            commands,
            state,
            handlers: PushHandlers::new(),
            subscriptions: BTreeSet::new(),
            pending: HashMap::new(),
            next_id: 1,
            intent: Intent::Idle,
            link_open: false,
            paused: false,
            heartbeat: None,
            keep_alive: None,
            ping_deadline: None,
            idle_deadline: None,
            reconnect_at: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(url = %self.url, "connection actor started");
        loop {
            let invocation_deadline = self.next_invocation_deadline();
            let wake = tokio::select! {
                biased;
                command = self.commands.recv() => Wake::Command(command),
                alive = network_changed(&mut self.network) => Wake::Network(alive),
                event = self.transport.next_event(), if self.link_open => Wake::Transport(event),
                _ = sleep_opt(invocation_deadline) => Wake::InvocationTimeout,
                _ = sleep_opt(self.ping_deadline) => Wake::PingTimeout,
                _ = sleep_opt(self.idle_deadline) => Wake::ServerTimeout,
                _ = tick_opt(&mut self.heartbeat) => Wake::Heartbeat,
                _ = tick_opt(&mut self.keep_alive) => Wake::KeepAlive,
                _ = sleep_opt(self.reconnect_at) => Wake::Reconnect,
            };

            match wake {
                Wake::Command(Some(command)) => {
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                Wake::Command(None) => {
                    // Every handle is gone
                    self.shutdown().await;
                    break;
                }
                Wake::Network(true) => self.on_network_change(),
                Wake::Network(false) => {
                    debug!("connectivity stream closed");
                    self.network = None;
                }
                Wake::Transport(event) => self.on_transport(event).await,
                Wake::InvocationTimeout => self.expire_invocations(),
                Wake::PingTimeout => self.on_link_lost("heartbeat timed out").await,
                Wake::ServerTimeout => self.on_link_lost("server timeout").await,
                Wake::Heartbeat => self.send_heartbeat().await,
                Wake::KeepAlive => self.send_keep_alive().await,
                Wake::Reconnect => self.on_reconnect_timer().await,
            }
        }
        debug!("connection actor stopped");
    }

    /// Returns false once the actor should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect { reply } => {
                let result = self.connect().await;
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Join { route_id, reply } => self.join(route_id, reply).await,
            Command::Leave { route_id, reply } => self.leave(route_id, reply).await,
            Command::Register(registration) => self.handlers.register(registration),
            Command::Subscriptions { reply } => {
                let _ = reply.send(self.subscriptions.iter().cloned().collect());
            }
            Command::Pause => self.pause(),
            Command::Resume => self.resume().await,
            Command::Dispose { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn current(&self) -> RealtimeConnectionState {
        self.state.borrow().clone()
    }

    fn transition(&self, next: impl FnOnce(&RealtimeConnectionState) -> RealtimeConnectionState) {
        let next = next(&self.state.borrow());
        let previous = self.state.send_replace(next.clone());
        if previous.status != next.status {
            info!(from = %previous.status, to = %next.status, retry = next.retry_count, "realtime status");
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    async fn connect(&mut self) -> Result<()> {
        if self.link_open {
            return Ok(());
        }
        // A caller-driven attempt replaces any scheduled one
        self.reconnect_at = None;
        match self.open_link().await {
            Ok(()) => {
                self.intent = Intent::Online;
                Ok(())
            }
            Err(Error::NetworkUnavailable) => Err(Error::NetworkUnavailable),
            Err(e) => {
                self.transition(|s| s.failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Opens the transport and brings the link up. Leaves status alone on
    /// failure; callers record the outcome.
    async fn open_link(&mut self) -> Result<()> {
        if !self.monitor.is_online() {
            return Err(Error::NetworkUnavailable);
        }
        if self.current().status != RealtimeStatus::Reconnecting {
            self.transition(|s| s.connecting());
        }

        let result = timeout(self.config.connect_timeout(), self.transport.connect(&self.url)).await;
        let error = match result {
            Ok(Ok(())) => {
                self.on_link_opened().await;
                return Ok(());
            }
            Ok(Err(e)) => Error::Transport(e.to_string()),
            Err(_) => Error::Timeout(format!("connecting to {}", self.url)),
        };
        // Drop whatever half-open state the attempt left behind
        let _ = self.transport.disconnect().await;
        Err(error)
    }

    async fn on_link_opened(&mut self) {
        self.link_open = true;
        self.reconnect_at = None;
        self.transition(|s| s.connected(Utc::now()));
        if !self.paused {
            self.start_liveness();
        }
        self.replay_subscriptions().await;
    }

    async fn replay_subscriptions(&mut self) {
        let topics: Vec<String> = self.subscriptions.iter().cloned().collect();
        if !topics.is_empty() {
            debug!(count = topics.len(), "replaying subscriptions");
        }
        for route_id in topics {
            let id = self.next_id();
            match self.transport.send(ClientMessage::join(id, route_id.as_str())).await {
                Ok(()) => {
                    self.pending.insert(id, Pending::Replay(route_id));
                }
                Err(e) => warn!(route_id = %route_id, error = %e, "failed to rejoin queue updates"),
            }
        }
    }

    fn start_liveness(&mut self) {
        self.heartbeat = self.config.heartbeat_interval().map(every);
        self.keep_alive = self.config.keep_alive_interval().map(every);
        self.idle_deadline = self.config.server_timeout().map(|t| Instant::now() + t);
        self.ping_deadline = None;
    }

    fn stop_liveness(&mut self) {
        self.heartbeat = None;
        self.keep_alive = None;
        self.idle_deadline = None;
        self.ping_deadline = None;
    }

    /// Any inbound traffic proves the server is alive.
    fn touch(&mut self) {
        if self.idle_deadline.is_some() {
            self.idle_deadline = self.config.server_timeout().map(|t| Instant::now() + t);
        }
    }

    async fn disconnect(&mut self) {
        self.intent = Intent::Idle;
        self.reconnect_at = None;
        self.stop_liveness();
        self.link_open = false;
        let _ = self.transport.disconnect().await;
        self.fail_pending("disconnected");
        self.transition(|s| s.disconnected(Utc::now()).with_retry_count(0));
        info!("push connection closed by caller");
    }

    async fn join(&mut self, route_id: String, reply: oneshot::Sender<Result<()>>) {
        self.subscriptions.insert(route_id.clone());
        if !self.link_open {
            let _ = reply.send(Err(Error::NotConnected));
            return;
        }
        let id = self.next_id();
        let label = format!("join_queue_updates({route_id})");
        match self.transport.send(ClientMessage::join(id, route_id)).await {
            Ok(()) => self.await_completion(id, label, reply),
            Err(e) => {
                let _ = reply.send(Err(Error::Transport(e.to_string())));
            }
        }
    }

    async fn leave(&mut self, route_id: String, reply: oneshot::Sender<Result<()>>) {
        self.subscriptions.remove(&route_id);
        if !self.link_open {
            let _ = reply.send(Ok(()));
            return;
        }
        let id = self.next_id();
        let label = format!("leave_queue_updates({route_id})");
        match self.transport.send(ClientMessage::leave(id, route_id)).await {
            Ok(()) => self.await_completion(id, label, reply),
            Err(e) => {
                let _ = reply.send(Err(Error::Transport(e.to_string())));
            }
        }
    }

    fn await_completion(&mut self, id: u64, label: String, reply: oneshot::Sender<Result<()>>) {
        let deadline = Instant::now() + self.config.invocation_timeout();
        self.pending.insert(
            id,
            Pending::Caller {
                reply,
                label,
                deadline,
            },
        );
    }

    fn next_invocation_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .filter_map(|pending| match pending {
                Pending::Caller { deadline, .. } => Some(*deadline),
                _ => None,
            })
            .min()
    }

    /// Fails caller invocations whose deadline has passed. A completion
    /// arriving later is ignored as unknown.
    fn expire_invocations(&mut self) {
        let now = Instant::now();
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, pending)| {
                matches!(pending, Pending::Caller { deadline, .. } if *deadline <= now)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(Pending::Caller { reply, label, .. }) = self.pending.remove(&id) {
                debug!(id, %label, "invocation timed out");
                let _ = reply.send(Err(Error::Timeout(label)));
            }
        }
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.stop_liveness();
        self.reconnect_at = None;
        info!("push connection paused");
    }

    async fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        info!("push connection resumed");
        if self.link_open {
            self.start_liveness();
            return;
        }
        if self.intent == Intent::Online {
            self.transition(|s| s.with_retry_count(0));
            if let Err(e) = self.connect().await {
                warn!(error = %e, "connect on resume failed");
            }
        }
    }

    async fn on_transport(&mut self, event: TransportResult<TransportEvent>) {
        match event {
            Ok(TransportEvent::Message(message)) => {
                self.touch();
                match message {
                    ServerMessage::Completion { id, error } => self.on_completion(id, error).await,
                    ServerMessage::Push { target, payload } => self.on_push(&target, payload),
                }
            }
            Ok(TransportEvent::Reconnecting(reason)) => {
                let attempt = self.current().retry_count.saturating_add(1);
                warn!(attempt, reason = %reason, "transport is re-establishing the link");
                self.stop_liveness();
                self.fail_pending(&reason);
                self.transition(|s| s.reconnecting(attempt).with_error(reason.as_str()));
            }
            Ok(TransportEvent::Reconnected) => {
                info!("transport re-established the link");
                self.transition(|s| s.connected(Utc::now()));
                if !self.paused {
                    self.start_liveness();
                }
                self.replay_subscriptions().await;
            }
            Ok(TransportEvent::Closed(reason)) => {
                let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                self.on_link_lost(&reason).await;
            }
            Err(TransportError::SerializationError(e)) => {
                self.touch();
                warn!(error = %e, "dropping malformed frame");
            }
            Err(e) => self.on_link_lost(&e.to_string()).await,
        }
    }

    async fn on_completion(&mut self, id: u64, error: Option<String>) {
        match self.pending.remove(&id) {
            Some(Pending::Caller { reply, .. }) => {
                let result = match error {
                    None => Ok(()),
                    Some(e) => Err(Error::Transport(format!("hub rejected invocation: {e}"))),
                };
                let _ = reply.send(result);
            }
            Some(Pending::Replay(route_id)) => match error {
                None => debug!(route_id = %route_id, "rejoined queue updates"),
                Some(e) => warn!(route_id = %route_id, error = %e, "hub rejected rejoin"),
            },
            Some(Pending::Ping) => {
                self.ping_deadline = None;
                if let Some(e) = error {
                    self.on_link_lost(&format!("heartbeat failed: {e}")).await;
                }
            }
            None => debug!(id, "completion for unknown invocation"),
        }
    }

    fn on_push(&self, target: &str, payload: Value) {
        match PushMessage::decode(target, payload) {
            Ok(message) => {
                let delivered = self.handlers.dispatch(&message);
                debug!(target, delivered, "push dispatched");
            }
            Err(e) => warn!(target, error = %e, "dropping malformed push"),
        }
    }

    async fn send_heartbeat(&mut self) {
        if self.ping_deadline.is_some() {
            // Previous ping still outstanding; its deadline decides
            return;
        }
        let id = self.next_id();
        match self.transport.send(ClientMessage::ping(id)).await {
            Ok(()) => {
                self.pending.insert(id, Pending::Ping);
                self.ping_deadline = Some(Instant::now() + self.config.invocation_timeout());
            }
            Err(e) => self.on_link_lost(&format!("heartbeat failed: {e}")).await,
        }
    }

    async fn send_keep_alive(&mut self) {
        if let Err(e) = self.transport.keep_alive().await {
            self.on_link_lost(&format!("keep-alive failed: {e}")).await;
        }
    }

    /// The unexpected-close path shared by transport closes, failed pings and
    /// server timeouts.
    async fn on_link_lost(&mut self, reason: &str) {
        if !self.link_open {
            return;
        }
        warn!(reason, "push connection lost");
        self.link_open = false;
        self.stop_liveness();
        let _ = self.transport.disconnect().await;
        self.fail_pending(reason);
        self.transition(|s| s.dropped(Utc::now(), reason));
        self.schedule_reconnect();
    }

    fn fail_pending(&mut self, reason: &str) {
        for (_, pending) in self.pending.drain() {
            if let Pending::Caller { reply, .. } = pending {
                let _ = reply.send(Err(Error::Transport(format!("connection lost: {reason}"))));
            }
        }
        self.ping_deadline = None;
    }

    /// Arms the single reconnect timer, replacing any earlier one.
    fn schedule_reconnect(&mut self) {
        self.reconnect_at = None;
        if self.paused || self.intent != Intent::Online {
            return;
        }
        if !self.monitor.is_online() {
            info!("offline, reconnect waits for the network");
            return;
        }

        let attempts = self.current().retry_count;
        if attempts >= self.config.max_reconnect_attempts {
            let exhausted = Error::RetriesExhausted { attempts };
            warn!(attempts, "giving up on the push connection");
            self.transition(|s| s.failed(format!("max reconnection attempts reached ({exhausted})")));
            return;
        }

        let delay = self.backoff.next_delay(attempts);
        debug!(attempt = attempts + 1, ?delay, "reconnect scheduled");
        self.reconnect_at = Some(Instant::now() + delay);
    }

    async fn on_reconnect_timer(&mut self) {
        self.reconnect_at = None;
        if self.paused || self.link_open || self.intent != Intent::Online {
            return;
        }
        if !self.monitor.is_online() {
            return;
        }

        let attempt = self.current().retry_count.saturating_add(1);
        self.transition(|s| s.reconnecting(attempt));
        if let Err(e) = self.open_link().await {
            warn!(attempt, error = %e, "reconnect attempt failed");
            self.transition(|s| s.with_error(e.to_string()));
            self.schedule_reconnect();
        }
    }

    fn on_network_change(&mut self) {
        let Some(network) = self.network.as_mut() else {
            return;
        };
        let online = network.borrow_and_update().is_online();
        if online == self.was_online {
            return;
        }
        self.was_online = online;

        if !online {
            if self.reconnect_at.take().is_some() {
                info!("network lost, reconnect deferred until it returns");
            }
            return;
        }
        if self.intent == Intent::Online && !self.link_open && !self.paused {
            info!("network restored, reconnecting");
            self.transition(|s| s.with_retry_count(0));
            self.schedule_reconnect();
        }
    }

    async fn shutdown(&mut self) {
        self.intent = Intent::Idle;
        self.reconnect_at = None;
        self.stop_liveness();
        if self.link_open {
            self.link_open = false;
            self.transition(|s| s.disconnected(Utc::now()));
        }
        let _ = self.transport.disconnect().await;
        self.fail_pending("disposed");
        self.handlers.clear();
        self.subscriptions.clear();
        info!("push connection disposed");
    }
}

fn every(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn network_changed(network: &mut Option<watch::Receiver<ConnectionState>>) -> bool {
    match network {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

async fn tick_opt(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
