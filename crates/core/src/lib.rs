// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rideline-core: Shared data model for the rideline connectivity core
//!
//! This crate provides the value types, wire protocol, error taxonomy,
//! backoff policy and configuration used by the runtime components in
//! `rideline-link` and by the development hub.

pub mod action;
pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod realtime;

pub use action::{ActionOutcome, ActionPriority, ActionStatus, SyncAction};
pub use backoff::Backoff;
pub use config::{Config, ConnectivityConfig, QueueConfig, RealtimeConfig};
pub use connection::{ConnectionState, ConnectionType, NetworkQuality};
pub use error::{Error, Result};
pub use messages::{
    PushMessage, PushTarget, TripStatus, TripStatusChange, VehiclePositionUpdate,
    VehicleQueueUpdate,
};
pub use protocol::{ClientMessage, ServerMessage};
pub use realtime::{RealtimeConnectionState, RealtimeStatus};
