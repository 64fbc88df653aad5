// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the transport module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::{Transport, TransportError, TransportEvent, TransportFuture, TransportResult};
use rideline_core::protocol::{ClientMessage, ServerMessage};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct Script {
    connected: bool,
    connect_count: u32,
    /// Remaining connects that should fail.
    connect_failures: u32,
    outgoing: Vec<ClientMessage>,
    keep_alives: u32,
    /// Answer every invocation with a completion.
    ack_invocations: bool,
    /// Answer pings with an error completion.
    reject_pings: bool,
    /// Leave pings unanswered.
    drop_pings: bool,
}

/// Mock transport for testing without real sockets.
///
/// The transport is moved into the connection manager; tests keep the
/// paired [`MockRemote`] to script it and inspect what was sent.
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
    inbound_tx: mpsc::UnboundedSender<TransportResult<TransportEvent>>,
    inbound_rx: mpsc::UnboundedReceiver<TransportResult<TransportEvent>>,
}

/// Test-side handle onto a [`MockTransport`].
#[derive(Clone)]
pub struct MockRemote {
    script: Arc<Mutex<Script>>,
    inbound_tx: mpsc::UnboundedSender<TransportResult<TransportEvent>>,
}

impl MockTransport {
    /// A transport that acknowledges every invocation.
    pub fn new() -> (Self, MockRemote) {
        let script = Arc::new(Mutex::new(Script {
            ack_invocations: true,
            ..Script::default()
        }));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let remote = MockRemote {
            script: Arc::clone(&script),
            inbound_tx: inbound_tx.clone(),
        };
        (
            MockTransport {
                script,
                inbound_tx,
                inbound_rx,
            },
            remote,
        )
    }
}

impl MockRemote {
    /// Deliver an event to the transport's reader.
    pub fn push(&self, event: TransportEvent) {
        self.inbound_tx.send(Ok(event)).unwrap();
    }

    /// Deliver a read error to the transport's reader.
    pub fn push_error(&self, error: TransportError) {
        self.inbound_tx.send(Err(error)).unwrap();
    }

    /// Simulate the server dropping the link.
    pub fn close(&self, reason: Option<&str>) {
        self.push(TransportEvent::Closed(reason.map(str::to_string)));
    }

    /// Make the next `n` connects fail.
    pub fn fail_connects(&self, n: u32) {
        self.script.lock().unwrap().connect_failures = n;
    }

    pub fn set_ack_invocations(&self, ack: bool) {
        self.script.lock().unwrap().ack_invocations = ack;
    }

    pub fn set_reject_pings(&self, reject: bool) {
        self.script.lock().unwrap().reject_pings = reject;
    }

    pub fn set_drop_pings(&self, drop: bool) {
        self.script.lock().unwrap().drop_pings = drop;
    }

    pub fn connect_count(&self) -> u32 {
        self.script.lock().unwrap().connect_count
    }

    pub fn keep_alives(&self) -> u32 {
        self.script.lock().unwrap().keep_alives
    }

    pub fn is_connected(&self) -> bool {
        self.script.lock().unwrap().connected
    }

    /// Get all messages that were sent.
    pub fn outgoing(&self) -> Vec<ClientMessage> {
        self.script.lock().unwrap().outgoing.clone()
    }

    /// Route ids of every join sent, in order.
    pub fn joins(&self) -> Vec<String> {
        self.outgoing()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::JoinQueueUpdates { route_id, .. } => Some(route_id),
                _ => None,
            })
            .collect()
    }

    pub fn pings(&self) -> usize {
        self.outgoing()
            .iter()
            .filter(|m| matches!(m, ClientMessage::Ping { .. }))
            .count()
    }

    pub fn clear_outgoing(&self) {
        self.script.lock().unwrap().outgoing.clear();
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _url: &str) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            script.connect_count += 1;
            if script.connect_failures > 0 {
                script.connect_failures -= 1;
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            script.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.script.lock().unwrap().connected = false;
            while self.inbound_rx.try_recv().is_ok() {}
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            if !script.connected {
                return Err(TransportError::ConnectionClosed);
            }
            let id = msg.id();
            let is_ping = matches!(msg, ClientMessage::Ping { .. });
            script.outgoing.push(msg);

            let reply = if is_ping && script.drop_pings {
                None
            } else if is_ping && script.reject_pings {
                Some(ServerMessage::completion_error(id, "ping rejected"))
            } else if script.ack_invocations {
                Some(ServerMessage::completion(id))
            } else {
                None
            };
            if let Some(reply) = reply {
                let _ = self.inbound_tx.send(Ok(TransportEvent::Message(reply)));
            }
            Ok(())
        })
    }

    fn next_event(&mut self) -> TransportFuture<'_, TransportEvent> {
        Box::pin(async move {
            match self.inbound_rx.recv().await {
                Some(Ok(TransportEvent::Closed(reason))) => {
                    self.script.lock().unwrap().connected = false;
                    Ok(TransportEvent::Closed(reason))
                }
                Some(event) => event,
                // The transport holds a sender itself, so this never ends
                None => std::future::pending().await,
            }
        })
    }

    fn keep_alive(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut script = self.script.lock().unwrap();
            if !script.connected {
                return Err(TransportError::ConnectionClosed);
            }
            script.keep_alives += 1;
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.script.lock().unwrap().connected
    }
}

#[tokio::test]
async fn test_mock_transport_connect() {
    let (mut transport, remote) = MockTransport::new();
    assert!(!transport.is_connected());

    transport.connect("ws://localhost:1234").await.unwrap();
    assert!(transport.is_connected());
    assert_eq!(remote.connect_count(), 1);

    transport.disconnect().await.unwrap();
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_mock_transport_acks_invocations() {
    let (mut transport, remote) = MockTransport::new();
    transport.connect("ws://localhost:1234").await.unwrap();

    transport.send(ClientMessage::join(7, "r-1")).await.unwrap();
    assert_eq!(remote.joins(), vec!["r-1".to_string()]);

    let event = transport.next_event().await.unwrap();
    assert_eq!(
        event,
        TransportEvent::Message(ServerMessage::completion(7))
    );
}

#[tokio::test]
async fn test_mock_transport_connect_fail() {
    let (mut transport, remote) = MockTransport::new();
    remote.fail_connects(1);

    let result = transport.connect("ws://localhost:1234").await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    assert!(!transport.is_connected());

    transport.connect("ws://localhost:1234").await.unwrap();
    assert!(transport.is_connected());
}

#[tokio::test]
async fn test_mock_transport_close_marks_disconnected() {
    let (mut transport, remote) = MockTransport::new();
    transport.connect("ws://localhost:1234").await.unwrap();

    remote.close(Some("server restart"));
    let event = transport.next_event().await.unwrap();

    assert_eq!(
        event,
        TransportEvent::Closed(Some("server restart".to_string()))
    );
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_send_while_disconnected_fails() {
    let (mut transport, _remote) = MockTransport::new();
    let result = transport.send(ClientMessage::ping(1)).await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
}

#[tokio::test]
async fn test_websocket_transport_starts_disconnected() {
    let mut transport = super::WebSocketTransport::new();
    assert!(!transport.is_connected());

    let result = transport.send(ClientMessage::ping(1)).await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));

    let result = transport.next_event().await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
}

#[tokio::test]
async fn test_websocket_transport_connect_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut transport = super::WebSocketTransport::new();
    let result = transport.connect(&format!("ws://{addr}/hubs/transport")).await;

    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    assert!(!transport.is_connected());
}
