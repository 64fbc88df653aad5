// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rideline-hub: a small push hub for local development and end-to-end tests.
//!
//! It speaks the same wire protocol as production: clients invoke
//! `join_queue_updates`, `leave_queue_updates` and `ping` and receive
//! completions, and the hub pushes typed records by target name.
//!
//! ```rust,no_run
//! # use rideline_hub::HubState;
//! # use serde_json::json;
//! # use tokio::net::TcpListener;
//! # async fn demo() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:0").await?;
//! let state = HubState::new();
//! tokio::spawn(rideline_hub::serve(listener, "/hubs/transport".into(), state.clone()));
//! state.publish(
//!     "TripStatusChange",
//!     json!({
//!         "tripId": "T-1",
//!         "userId": "U-1",
//!         "status": "boarding",
//!         "timestamp": "2026-01-01T08:00:00Z"
//!     }),
//! );
//! # Ok(())
//! # }
//! ```

mod server;
mod state;

pub use server::{run, serve};
pub use state::{ConnectionId, HubState};
