// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity core configuration.
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! file (or no file at all) yields the stock behaviour:
//!
//! ```toml
//! base_url = "https://api.example.com"
//!
//! [realtime]
//! hub_path = "/hubs/transport"
//! max_reconnect_attempts = 10
//!
//! [connectivity]
//! probe_endpoints = ["1.1.1.1:443", "8.8.8.8:53"]
//!
//! [queue]
//! max_concurrent = 1
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the API host (`http(s)://` or `ws(s)://`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Push connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Path of the push endpoint under `base_url` (default: "/hubs/transport").
    #[serde(default = "default_hub_path")]
    pub hub_path: String,
    /// First reconnect delay in milliseconds (default: 1000).
    #[serde(default = "default_initial_reconnect_delay_ms")]
    pub initial_reconnect_delay_ms: u64,
    /// Cap on the reconnect delay in milliseconds (default: 30000).
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
    /// Reconnect attempts before giving up (default: 10).
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Heartbeat ping interval in milliseconds (default: 15000). 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Silence from the server tolerated before the link counts as dead
    /// (default: 30000). 0 = disabled.
    #[serde(default = "default_server_timeout_ms")]
    pub server_timeout_ms: u64,
    /// Interval of transport-level keep-alive frames (default: 15000). 0 = disabled.
    #[serde(default = "default_keep_alive_interval_ms")]
    pub keep_alive_interval_ms: u64,
    /// Max time for the transport handshake in milliseconds (default: 10000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Max time to wait for an invocation's completion (default: 10000).
    #[serde(default = "default_invocation_timeout_ms")]
    pub invocation_timeout_ms: u64,
}

/// Reachability probing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// `host:port` endpoints tried in order by the reachability probe.
    #[serde(default = "default_probe_endpoints")]
    pub probe_endpoints: Vec<String>,
    /// Per-endpoint probe timeout in milliseconds (default: 5000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Probe latency above which quality is reported as poor (default: 1500).
    #[serde(default = "default_poor_latency_ms")]
    pub poor_latency_ms: u64,
    /// Periodic re-check interval in milliseconds (default: 30000).
    #[serde(default = "default_recheck_interval_ms")]
    pub recheck_interval_ms: u64,
}

/// Offline action queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Storage key holding the serialized queue.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Safety-net processing interval in milliseconds (default: 5000).
    #[serde(default = "default_processing_interval_ms")]
    pub processing_interval_ms: u64,
    /// Actions processed per batch (default: 1).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Minimum wait before a retried action is attempted again (default: 2000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Age after which terminal actions are swept at startup (default: 7 days).
    #[serde(default = "default_max_action_age_secs")]
    pub max_action_age_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5080".to_string()
}

fn default_hub_path() -> String {
    "/hubs/transport".to_string()
}

fn default_initial_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_heartbeat_interval_ms() -> u64 {
    15_000
}

fn default_server_timeout_ms() -> u64 {
    30_000
}

fn default_keep_alive_interval_ms() -> u64 {
    15_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_invocation_timeout_ms() -> u64 {
    10_000
}

fn default_probe_endpoints() -> Vec<String> {
    vec![
        "1.1.1.1:443".to_string(),
        "8.8.8.8:53".to_string(),
        "208.67.222.222:443".to_string(),
    ]
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_poor_latency_ms() -> u64 {
    1500
}

fn default_recheck_interval_ms() -> u64 {
    30_000
}

fn default_storage_key() -> String {
    "offline_action_queue".to_string()
}

fn default_processing_interval_ms() -> u64 {
    5000
}

fn default_max_concurrent() -> usize {
    1
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_action_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

/// Converts a millisecond setting where 0 means "disabled".
fn optional_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            realtime: RealtimeConfig::default(),
            connectivity: ConnectivityConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig {
            hub_path: default_hub_path(),
            initial_reconnect_delay_ms: default_initial_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            server_timeout_ms: default_server_timeout_ms(),
            keep_alive_interval_ms: default_keep_alive_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            invocation_timeout_ms: default_invocation_timeout_ms(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        ConnectivityConfig {
            probe_endpoints: default_probe_endpoints(),
            probe_timeout_ms: default_probe_timeout_ms(),
            poor_latency_ms: default_poor_latency_ms(),
            recheck_interval_ms: default_recheck_interval_ms(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            storage_key: default_storage_key(),
            processing_interval_ms: default_processing_interval_ms(),
            max_concurrent: default_max_concurrent(),
            retry_delay_ms: default_retry_delay_ms(),
            max_action_age_secs: default_max_action_age_secs(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the components cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.connectivity.probe_endpoints.is_empty() {
            return Err(Error::Config(
                "connectivity.probe_endpoints must list at least one endpoint".to_string(),
            ));
        }
        if self.connectivity.recheck_interval_ms == 0 {
            return Err(Error::Config(
                "connectivity.recheck_interval_ms must be positive".to_string(),
            ));
        }
        if self.queue.processing_interval_ms == 0 {
            return Err(Error::Config(
                "queue.processing_interval_ms must be positive".to_string(),
            ));
        }
        if self.realtime.connect_timeout_ms == 0 {
            return Err(Error::Config(
                "realtime.connect_timeout_ms must be positive".to_string(),
            ));
        }
        if self.realtime.invocation_timeout_ms == 0 {
            return Err(Error::Config(
                "realtime.invocation_timeout_ms must be positive".to_string(),
            ));
        }
        if self.queue.max_concurrent == 0 {
            return Err(Error::Config(
                "queue.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.realtime.initial_reconnect_delay_ms > self.realtime.max_reconnect_delay_ms {
            return Err(Error::Config(format!(
                "realtime.initial_reconnect_delay_ms ({}) exceeds max_reconnect_delay_ms ({})",
                self.realtime.initial_reconnect_delay_ms, self.realtime.max_reconnect_delay_ms
            )));
        }
        Ok(())
    }

    /// Full WebSocket URL of the push endpoint.
    pub fn hub_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        let path = self.realtime.hub_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl RealtimeConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.initial_reconnect_delay_ms),
            Duration::from_millis(self.max_reconnect_delay_ms),
        )
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        optional_ms(self.heartbeat_interval_ms)
    }

    pub fn server_timeout(&self) -> Option<Duration> {
        optional_ms(self.server_timeout_ms)
    }

    pub fn keep_alive_interval(&self) -> Option<Duration> {
        optional_ms(self.keep_alive_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_millis(self.invocation_timeout_ms)
    }
}

impl ConnectivityConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn poor_latency(&self) -> Duration {
        Duration::from_millis(self.poor_latency_ms)
    }

    /// Never zero, even if the setting skipped validation.
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms.max(1))
    }
}

impl QueueConfig {
    /// Never zero, even if the setting skipped validation.
    pub fn processing_interval(&self) -> Duration {
        Duration::from_millis(self.processing_interval_ms.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_action_age(&self) -> Duration {
        Duration::from_secs(self.max_action_age_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
