// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the push connection.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing

use std::future::Future;
use std::pin::Pin;

use rideline_core::protocol::{ClientMessage, ServerMessage};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// An inbound frame was not a valid server message. The link stays up.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// Something that happened on the link.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A frame from the server.
    Message(ServerMessage),
    /// The transport lost the link and is re-establishing it on its own.
    Reconnecting(String),
    /// The transport re-established the link on its own.
    Reconnected,
    /// The link is gone. Carries the close reason when the peer sent one.
    Closed(Option<String>),
}

/// Transport trait for WebSocket-like communication.
///
/// Implementations must keep `next_event` cancel safe: the connection
/// manager polls it inside `select!` and drops the future whenever another
/// branch wins.
pub trait Transport: Send + Sync {
    /// Connect to a remote server.
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    /// Disconnect from the server.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send a message to the server.
    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()>;

    /// Wait for the next event on the link.
    fn next_event(&mut self) -> TransportFuture<'_, TransportEvent>;

    /// Send a transport-level keep-alive frame.
    fn keep_alive(&mut self) -> TransportFuture<'_, ()>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
///
/// Never reconnects on its own; a dropped socket surfaces as
/// [`TransportEvent::Closed`] and the manager decides what happens next.
pub struct WebSocketTransport {
    /// The WebSocket connection, if connected.
    ws: Option<WebSocketConnection>,
}

/// Internal WebSocket connection wrapper.
struct WebSocketConnection {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }

    async fn send_frame(
        &mut self,
        frame: tokio_tungstenite::tungstenite::Message,
    ) -> TransportResult<()> {
        use futures_util::SinkExt;

        let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

        if let Err(e) = ws.sink.send(frame).await {
            // Connection is broken, clear it
            self.ws = None;
            return Err(TransportError::SendFailed(e.to_string()));
        }

        // Flush so a dead peer shows up here rather than on the next frame
        if let Err(e) = ws.sink.flush().await {
            self.ws = None;
            return Err(TransportError::SendFailed(e.to_string()));
        }

        Ok(())
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            use futures_util::StreamExt;

            let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                use futures_util::SinkExt;
                // The socket is being dropped either way
                let _ = ws.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            use tokio_tungstenite::tungstenite::Message;

            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            self.send_frame(Message::Text(json.into())).await
        })
    }

    fn next_event(&mut self) -> TransportFuture<'_, TransportEvent> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let msg: ServerMessage = serde_json::from_str(&text)
                            .map_err(|e| TransportError::SerializationError(e.to_string()))?;
                        return Ok(TransportEvent::Message(msg));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        self.ws = None;
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        return Ok(TransportEvent::Closed(reason));
                    }
                    Some(Ok(_)) => {
                        // Ping/pong and binary frames carry nothing for us
                        continue;
                    }
                    Some(Err(e)) => {
                        self.ws = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                    None => {
                        self.ws = None;
                        return Ok(TransportEvent::Closed(None));
                    }
                }
            }
        })
    }

    fn keep_alive(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            use tokio_tungstenite::tungstenite::Message;
            self.send_frame(Message::Ping(Vec::new().into())).await
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
pub(crate) mod tests;
