// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Handles client connections, invocation completions, and push fanout.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use rideline_core::{ClientMessage, ServerMessage};

use crate::state::{ConnectionId, HubState};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Bind `addr` and serve clients on `path` until the process exits.
pub async fn run(addr: SocketAddr, path: String, state: HubState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: ws://{}{}", listener.local_addr()?, path);
    serve(listener, path, state).await
}

/// Accept clients from an already-bound listener.
pub async fn serve(listener: TcpListener, path: String, state: HubState) -> Result<(), BoxError> {
    let path: Arc<str> = path.into();
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();
        let path = Arc::clone(&path);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, &path, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    path: &str,
    state: HubState,
) -> Result<(), BoxError> {
    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == path {
            return Ok(response);
        }
        warn!("Rejecting {} on unknown path {}", peer_addr, request.uri().path());
        let mut rejection = ErrorResponse::new(Some("unknown hub path".to_string()));
        *rejection.status_mut() = StatusCode::NOT_FOUND;
        Err(rejection)
    };
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;
    let mut connection = state.open_connection();
    let id = connection.id;
    info!("New WebSocket connection {} from: {}", id, peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let result: Result<(), BoxError> = async {
        loop {
            tokio::select! {
                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(response) = handle_client_message(&text, id, &state) {
                                ws_sink.send(Message::Text(response.to_json()?.into())).await?;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("Client {} disconnected", peer_addr);
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            ws_sink.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error from {}: {}", peer_addr, e);
                            break;
                        }
                        None => {
                            info!("Client {} stream ended", peer_addr);
                            break;
                        }
                    }
                }

                push = connection.pushes.recv() => {
                    match push {
                        Ok(msg) => {
                            if !state.delivers_to(id, &msg) {
                                continue;
                            }
                            if let Err(e) = ws_sink.send(Message::Text(msg.to_json()?.into())).await {
                                warn!("Failed to push to {}: {}", peer_addr, e);
                                break;
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!("Client {} lagged by {} messages", peer_addr, n);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                kicked = connection.kicks.changed() => {
                    if kicked.is_ok() {
                        info!("Dropping client {}", peer_addr);
                        let _ = ws_sink.send(Message::Close(None)).await;
                    }
                    break;
                }
            }
        }
        Ok(())
    }
    .await;

    state.close_connection(id);
    info!("Connection closed: {}", peer_addr);
    result
}

/// Process one client frame and return the reply, if any.
///
/// Frames that do not parse are logged and ignored; there is no id to
/// complete.
fn handle_client_message(text: &str, id: ConnectionId, state: &HubState) -> Option<ServerMessage> {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Ignoring malformed frame from connection {}: {}", id, e);
            return None;
        }
    };
    debug!("Received message: {:?}", msg);

    match msg {
        ClientMessage::JoinQueueUpdates {
            id: call,
            route_id,
        } => {
            if route_id.trim().is_empty() {
                return Some(ServerMessage::completion_error(call, "route id is empty"));
            }
            state.join(id, &route_id);
            debug!("Connection {} joined route {}", id, route_id);
            Some(ServerMessage::completion(call))
        }
        ClientMessage::LeaveQueueUpdates {
            id: call,
            route_id,
        } => {
            state.leave(id, &route_id);
            debug!("Connection {} left route {}", id, route_id);
            Some(ServerMessage::completion(call))
        }
        ClientMessage::Ping { id: call } => Some(ServerMessage::completion(call)),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
