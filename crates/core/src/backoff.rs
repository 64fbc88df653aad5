// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic capped exponential backoff.

use std::time::Duration;

/// Delay policy for reconnect attempts: `min(initial * 2^attempt, max)`.
///
/// No jitter is applied; the schedule is fully determined by the attempt
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff { initial, max }
    }

    /// Delay to wait before the attempt that follows `attempt` prior failures.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(Duration::from_millis(1000), Duration::from_millis(30_000))
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
