// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP/WebSocket server exposing `sentry_core`'s log inspection
//! engine: build state, build a router, serve until the shutdown token
//! fires.

pub mod config;
pub mod error;
pub mod stats;
pub mod state;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{CliConfig, FileConfig, ResolvedConfig};
use crate::state::AppState;
use crate::transport::build_router;

/// Resolve the effective configuration from CLI flags and an optional
/// YAML file layer (CLI always wins).
pub fn resolve_config(cli: &CliConfig) -> anyhow::Result<ResolvedConfig> {
    let file = cli.config_file.as_deref().map(FileConfig::from_yaml).transpose()?;
    let resolved = ResolvedConfig::build(cli, file.as_ref());
    resolved.validate()?;
    Ok(resolved)
}

/// Run the server until `shutdown` is cancelled (e.g. on ctrl-c).
pub async fn run(config: ResolvedConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let state = AppState::new(config, shutdown.clone())?;

    state.manager.start()?;
    tracing::info!(%addr, log_paths = ?state.config.log_paths, "sentry-server listening");

    let router = build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    state.manager.stop();
    Ok(())
}
