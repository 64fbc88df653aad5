// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between client and push hub.
//!
//! The protocol is small:
//! - Client invokes hub methods (join/leave a route's queue updates, ping),
//!   each carrying an id the hub echoes in a completion
//! - Hub pushes typed records to the client by target name

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Start receiving queue updates for a route.
    JoinQueueUpdates { id: u64, route_id: String },

    /// Stop receiving queue updates for a route.
    LeaveQueueUpdates { id: u64, route_id: String },

    /// Heartbeat round-trip.
    Ping { id: u64 },
}

/// Messages sent from hub to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges the invocation with the same id.
    Completion {
        id: u64,
        /// Set when the hub rejected the invocation.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A record pushed to the client.
    ///
    /// The payload stays raw here so one malformed record can be dropped
    /// without tearing down the connection.
    Push { target: String, payload: Value },
}

impl ClientMessage {
    /// Creates a JoinQueueUpdates message.
    pub fn join(id: u64, route_id: impl Into<String>) -> Self {
        ClientMessage::JoinQueueUpdates {
            id,
            route_id: route_id.into(),
        }
    }

    /// Creates a LeaveQueueUpdates message.
    pub fn leave(id: u64, route_id: impl Into<String>) -> Self {
        ClientMessage::LeaveQueueUpdates {
            id,
            route_id: route_id.into(),
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Returns the invocation id.
    pub fn id(&self) -> u64 {
        match self {
            ClientMessage::JoinQueueUpdates { id, .. }
            | ClientMessage::LeaveQueueUpdates { id, .. }
            | ClientMessage::Ping { id } => *id,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates a successful Completion.
    pub fn completion(id: u64) -> Self {
        ServerMessage::Completion { id, error: None }
    }

    /// Creates a Completion carrying an error.
    pub fn completion_error(id: u64, error: impl Into<String>) -> Self {
        ServerMessage::Completion {
            id,
            error: Some(error.into()),
        }
    }

    /// Creates a Push message.
    pub fn push(target: impl Into<String>, payload: Value) -> Self {
        ServerMessage::Push {
            target: target.into(),
            payload,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
