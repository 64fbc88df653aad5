// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle state of the push connection.
//!
//! Transitions are methods on [`RealtimeConnectionState`] so the two
//! invariants live in one place: `retry_count` resets to zero exactly when
//! entering `Connected`, and `error` is cleared exactly when entering
//! `Connecting` or `Connected`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl RealtimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RealtimeStatus::Disconnected => "disconnected",
            RealtimeStatus::Connecting => "connecting",
            RealtimeStatus::Connected => "connected",
            RealtimeStatus::Reconnecting => "reconnecting",
            RealtimeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RealtimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observable state of the push connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeConnectionState {
    pub status: RealtimeStatus,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_disconnected_at: Option<DateTime<Utc>>,
}

impl RealtimeConnectionState {
    /// Initial state at manager construction.
    pub fn new() -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Disconnected,
            error: None,
            retry_count: 0,
            last_connected_at: None,
            last_disconnected_at: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == RealtimeStatus::Connected
    }

    pub fn connecting(&self) -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Connecting,
            error: None,
            ..self.clone()
        }
    }

    pub fn connected(&self, at: DateTime<Utc>) -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Connected,
            error: None,
            retry_count: 0,
            last_connected_at: Some(at),
            ..self.clone()
        }
    }

    /// Keeps any error already recorded so callers can see why the link dropped.
    pub fn disconnected(&self, at: DateTime<Utc>) -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Disconnected,
            last_disconnected_at: Some(at),
            ..self.clone()
        }
    }

    /// Same as [`disconnected`](Self::disconnected) but records the cause.
    pub fn dropped(&self, at: DateTime<Utc>, error: impl Into<String>) -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Disconnected,
            error: Some(error.into()),
            last_disconnected_at: Some(at),
            ..self.clone()
        }
    }

    pub fn reconnecting(&self, retry_count: u32) -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Reconnecting,
            retry_count,
            ..self.clone()
        }
    }

    pub fn failed(&self, error: impl Into<String>) -> Self {
        RealtimeConnectionState {
            status: RealtimeStatus::Failed,
            error: Some(error.into()),
            ..self.clone()
        }
    }

    /// Records an error without changing status.
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        RealtimeConnectionState {
            error: Some(error.into()),
            ..self.clone()
        }
    }

    pub fn with_retry_count(&self, retry_count: u32) -> Self {
        RealtimeConnectionState {
            retry_count,
            ..self.clone()
        }
    }
}

impl Default for RealtimeConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "realtime_tests.rs"]
mod tests;
