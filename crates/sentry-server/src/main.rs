// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use sentry_server::config::CliConfig;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match sentry_server::resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            std::process::exit(1);
        }
    };

    if config.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(config.env_filter()).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(config.env_filter()).init();
    }

    if cli.daemon {
        tracing::warn!("--daemon was requested but daemonization is out of scope; running in the foreground");
    }

    let shutdown = CancellationToken::new();
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown_for_signal.cancel();
    });

    if let Err(e) = sentry_server::run(config, shutdown).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
