// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Internet reachability probing.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rideline_core::ConnectivityConfig;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::debug;

/// Answers "can we actually reach the internet, and how fast?".
pub trait Reachability: Send + Sync {
    /// Latency of the first endpoint that answered, or `None` if none did.
    fn probe(&self) -> Pin<Box<dyn Future<Output = Option<Duration>> + Send + '_>>;
}

/// Probes by opening TCP connections to well-known endpoints.
///
/// Endpoints are tried in order; the first one that accepts within the
/// timeout wins and its connect time is the reported latency.
pub struct TcpReachability {
    endpoints: Vec<String>,
    timeout: Duration,
}

impl TcpReachability {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Self {
        TcpReachability { endpoints, timeout }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(config.probe_endpoints.clone(), config.probe_timeout())
    }
}

impl Reachability for TcpReachability {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Option<Duration>> + Send + '_>> {
        Box::pin(async move {
            for endpoint in &self.endpoints {
                let started = Instant::now();
                match timeout(self.timeout, TcpStream::connect(endpoint.as_str())).await {
                    Ok(Ok(_)) => {
                        let latency = started.elapsed();
                        debug!(endpoint = %endpoint, ?latency, "probe endpoint reachable");
                        return Some(latency);
                    }
                    Ok(Err(e)) => debug!(endpoint = %endpoint, error = %e, "probe endpoint refused"),
                    Err(_) => debug!(endpoint = %endpoint, "probe endpoint timed out"),
                }
            }
            None
        })
    }
}

#[cfg(test)]
#[path = "reachability_tests.rs"]
mod tests;
