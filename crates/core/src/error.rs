// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for rideline-core operations.

use thiserror::Error;

/// All possible errors surfaced by the connectivity core.
///
/// Only caller-invoked operations return these. Background loops (heartbeat,
/// scheduled reconnects, scheduled queue passes) record failures in observable
/// state instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network unavailable\n  hint: no interface is up or no probe endpoint answered")]
    NetworkUnavailable,

    #[error("not connected to the push endpoint")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("no handler registered for action type '{0}'")]
    HandlerMissing(String),

    #[error("malformed payload: {0}")]
    Deserialization(String),

    #[error("gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("{0} used before initialize()")]
    NotInitialized(&'static str),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("component has been disposed")]
    Disposed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for failures that a later attempt may clear.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::NetworkUnavailable
                | Error::NotConnected
                | Error::Transport(_)
                | Error::Timeout(_)
                | Error::Io(_)
        )
    }
}

/// A specialized Result type for rideline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
