// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time push connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐ commands ┌─────────────────┐     ┌─────────────┐
//! │ RealtimeConnectionManager│─────────►│ ConnectionActor │────►│  Transport  │
//! │        (handles)         │◄─────────│     (task)      │◄────│   (trait)   │
//! └──────────────────────────┘  state   └─────────────────┘     └─────────────┘
//!                                               ▲
//!                                               │ online / offline
//!                                     ┌─────────────────────┐
//!                                     │ ConnectivityMonitor │
//!                                     └─────────────────────┘
//! ```
//!
//! # Features
//!
//! - Deterministic capped exponential backoff on unexpected closes
//! - No reconnect attempts while offline; a fresh series when the network returns
//! - Heartbeat pings, server-silence timeout and transport keep-alives
//! - Route subscriptions replayed after every (re)connect
//! - Typed push handlers invoked in registration order

mod actor;
mod handlers;
mod manager;

pub use manager::RealtimeConnectionManager;
