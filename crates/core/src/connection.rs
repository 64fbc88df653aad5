// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network connectivity snapshots.
//!
//! A [`ConnectionState`] is an immutable observation. Each check produces a
//! new value that replaces the previous one wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of network interface currently up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Wifi,
    Mobile,
    Ethernet,
    None,
}

impl ConnectionType {
    /// Returns the string representation used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Wifi => "wifi",
            ConnectionType::Mobile => "mobile",
            ConnectionType::Ethernet => "ethernet",
            ConnectionType::None => "none",
        }
    }

    /// Returns true if some interface is present.
    pub fn is_present(&self) -> bool {
        !matches!(self, ConnectionType::None)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quality of the usable internet path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkQuality {
    Good,
    Poor,
    None,
}

impl NetworkQuality {
    /// Returns the string representation used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkQuality::Good => "good",
            NetworkQuality::Poor => "poor",
            NetworkQuality::None => "none",
        }
    }
}

impl fmt::Display for NetworkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One connectivity observation.
///
/// `is_online` implies `connection_type != ConnectionType::None`; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    is_online: bool,
    connection_type: ConnectionType,
    network_quality: NetworkQuality,
    last_checked: Option<DateTime<Utc>>,
}

impl ConnectionState {
    /// The state before any check has run.
    pub fn unknown() -> Self {
        ConnectionState {
            is_online: false,
            connection_type: ConnectionType::None,
            network_quality: NetworkQuality::None,
            last_checked: None,
        }
    }

    /// No interface, or interface retrieval failed.
    pub fn offline(checked_at: DateTime<Utc>) -> Self {
        ConnectionState {
            is_online: false,
            connection_type: ConnectionType::None,
            network_quality: NetworkQuality::None,
            last_checked: Some(checked_at),
        }
    }

    /// An interface is up but no probe endpoint answered.
    pub fn unreachable(connection_type: ConnectionType, checked_at: DateTime<Utc>) -> Self {
        ConnectionState {
            is_online: false,
            connection_type,
            network_quality: NetworkQuality::None,
            last_checked: Some(checked_at),
        }
    }

    /// A usable connection. Falls back to [`ConnectionState::offline`] when
    /// `connection_type` is `None`.
    pub fn online(
        connection_type: ConnectionType,
        network_quality: NetworkQuality,
        checked_at: DateTime<Utc>,
    ) -> Self {
        if !connection_type.is_present() {
            return ConnectionState::offline(checked_at);
        }
        ConnectionState {
            is_online: true,
            connection_type,
            network_quality,
            last_checked: Some(checked_at),
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn network_quality(&self) -> NetworkQuality {
        self.network_quality
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked
    }

    /// Compares the observed facts, ignoring when they were observed.
    ///
    /// Two observations that agree here are the same value as far as change
    /// notification is concerned.
    pub fn same_observation(&self, other: &ConnectionState) -> bool {
        self.is_online == other.is_online
            && self.connection_type == other.connection_type
            && self.network_quality == other.network_quality
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_online { "online" } else { "offline" };
        write!(
            f,
            "{} ({}, quality {})",
            status, self.connection_type, self.network_quality
        )
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
