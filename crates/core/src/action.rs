// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline actions and their outcomes.
//!
//! A [`SyncAction`] is a caller's unit of work recorded while the device may
//! be offline. Its serialized form is the persisted queue layout:
//! `id, type, payload, priority, maxRetries, createdAt, status, retryCount,
//! lastError`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Processing priority. Declaration order is the processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    High,
    Normal,
    Low,
}

impl ActionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPriority::High => "high",
            ActionPriority::Normal => "normal",
            ActionPriority::Low => "low",
        }
    }
}

impl fmt::Display for ActionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an action is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Processing => "processing",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal entries are immutable except for deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
        )
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A queued caller action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAction {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    pub priority: ActionPriority,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub status: ActionStatus,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Retries allowed when the caller does not choose.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

impl SyncAction {
    /// Creates a pending, normal-priority action stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        action_type: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        SyncAction {
            id: id.into(),
            action_type: action_type.into(),
            payload,
            priority: ActionPriority::Normal,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
            status: ActionStatus::Pending,
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns true if another failure may still be retried.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Queue order: priority first, then age. Never compares ids.
    pub fn queue_order(&self, other: &SyncAction) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
    }
}

/// What a handler reports after attempting an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub should_retry: bool,
}

impl ActionOutcome {
    pub fn success() -> Self {
        ActionOutcome {
            success: true,
            error: None,
            should_retry: false,
        }
    }

    /// A failure worth trying again later.
    pub fn retry(error: impl Into<String>) -> Self {
        ActionOutcome {
            success: false,
            error: Some(error.into()),
            should_retry: true,
        }
    }

    /// A failure that no retry will fix.
    pub fn permanent(error: impl Into<String>) -> Self {
        ActionOutcome {
            success: false,
            error: Some(error.into()),
            should_retry: false,
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
