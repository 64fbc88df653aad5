// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rideline-hub: development push hub.
//!
//! Serves the realtime push protocol so the client runtime can be exercised
//! without the production backend.

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rideline_hub::HubState;

/// rideline-hub: Development push hub
#[derive(Parser, Debug)]
#[command(name = "rideline-hub")]
#[command(about = "WebSocket push hub for rideline client development")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1:5080")]
    bind: SocketAddr,

    /// Path clients connect on
    #[arg(short, long, default_value = "/hubs/transport")]
    path: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let path = if args.path.starts_with('/') {
        args.path
    } else {
        format!("/{}", args.path)
    };

    info!("Starting rideline-hub");
    info!("  Bind address: {}", args.bind);
    info!("  Hub path: {}", path);

    rideline_hub::run(args.bind, path, HubState::new()).await
}
