// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `EngineStats` — an aggregate snapshot of every component's counters,
//! consumed by `/api/health` and the debug `/api/stats` endpoint.

use serde::Serialize;

use crate::cache::{CacheStats, PressureLevel};
use crate::hub::HubStats;
use crate::pool::PoolStats;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub pool: PoolStats,
    pub cache: CacheStats,
    pub hub: HubStats,
    pub memory_pressure: String,
}

impl EngineStats {
    pub fn new(pool: PoolStats, cache: CacheStats, hub: HubStats, pressure: PressureLevel) -> Self {
        let memory_pressure = match pressure {
            PressureLevel::Normal => "normal",
            PressureLevel::Warning => "warning",
            PressureLevel::Critical => "critical",
        }
        .to_owned();

        Self { pool, cache, hub, memory_pressure }
    }
}
