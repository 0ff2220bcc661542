// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/stats` debug snapshot, aggregating every engine component's
//! counters behind one `Arc<AppState>` read.

use std::sync::Arc;

use sentry_core::EngineStats;

use crate::state::AppState;

pub async fn stats_snapshot(state: &Arc<AppState>) -> EngineStats {
    let pool = state.manager.pool_stats();
    let cache = state.manager.cache.stats();
    let hub = state.hub.stats().await;
    let pressure = state.manager.cache.monitor.level();
    EngineStats::new(pool, cache, hub, pressure)
}
