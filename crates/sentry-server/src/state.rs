// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared server state: the single `Arc<...>` axum handlers extract.

use std::sync::Arc;
use std::time::Instant;

use sentry_core::{LogManager, LogManagerConfig, SearchEngine, SubscriptionHub};
use tokio_util::sync::CancellationToken;

use crate::config::ResolvedConfig;

pub struct AppState {
    pub manager: Arc<LogManager>,
    pub search: Arc<SearchEngine>,
    pub hub: Arc<SubscriptionHub>,
    pub config: ResolvedConfig,
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ResolvedConfig, shutdown: CancellationToken) -> anyhow::Result<Arc<Self>> {
        let manager = LogManager::new(LogManagerConfig {
            roots: config.log_paths.clone(),
            max_file_size: config.max_file_size,
            cache_memory_cap_bytes: config.cache_memory_cap_bytes(),
        })?;
        let search = Arc::new(SearchEngine::new(Arc::clone(&manager)));
        let hub = SubscriptionHub::new(Arc::clone(&manager));

        Ok(Arc::new(Self { manager, search, hub, config, shutdown, started_at: Instant::now() }))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
