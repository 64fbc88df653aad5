// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitoring.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  reports  ┌─────────────────────┐  snapshots
//! │ InterfaceSource  │──────────►│ ConnectivityMonitor │──────────► watch::Receiver
//! └──────────────────┘           └─────────────────────┘
//!                                          │ probe
//!                                          ▼
//!                                ┌─────────────────────┐
//!                                │    Reachability     │
//!                                └─────────────────────┘
//! ```
//!
//! A present interface is not enough to be online: the monitor also probes
//! well-known endpoints and grades the link by how fast one answers.

mod interfaces;
mod monitor;
mod reachability;

pub use interfaces::{InterfaceSource, PlatformInterfaces};
pub use monitor::ConnectivityMonitor;
pub use reachability::{Reachability, TcpReachability};
