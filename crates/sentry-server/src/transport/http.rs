// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the log inspection API: `State<Arc<...>>` extractors,
//! small request/response DTOs next to the handlers that use them.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use sentry_core::model::SearchQuery;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::stats::stats_snapshot;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
    pub uptime: u64,
}

/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp_millis(),
        uptime: state.uptime_secs(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

/// `GET /api/version` — a static struct from `CARGO_PKG_*`/build-time env
/// vars.
pub async fn version() -> impl IntoResponse {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("SENTRY_BUILD_COMMIT").unwrap_or("unknown"),
        build_time: option_env!("SENTRY_BUILD_TIME").unwrap_or("unknown"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
    })
}

/// `GET /api/stats` — debug-only aggregate engine snapshot.
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(stats_snapshot(&state).await)
}

/// `GET /api/logs`
pub async fn list_logs(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let tree = state.manager.get_log_files().map_err(ApiError::from)?;
    Ok(Json(tree))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadQuery {
    pub offset: u64,
    pub limit: u64,
    pub reverse: bool,
}

impl Default for ReadQuery {
    fn default() -> Self {
        Self { offset: 0, limit: 100, reverse: false }
    }
}

/// `GET /api/logs/{*path}`
pub async fn read_log(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.clamp(1, 1000);
    let resolved = state.manager.resolve_path(&PathBuf::from(path)).map_err(ApiError::from)?;
    let mut content =
        state.manager.read_log_file(&resolved, query.offset, limit).map_err(ApiError::from)?;

    if query.reverse {
        content.entries.reverse();
    }
    Ok(Json(content))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TailQuery {
    pub lines: u64,
}

impl Default for TailQuery {
    fn default() -> Self {
        Self { lines: 100 }
    }
}

/// `GET /api/logs/tail/{*path}`
pub async fn tail_log(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<TailQuery>,
) -> ApiResult<impl IntoResponse> {
    let lines = query.lines.clamp(1, 10_000);
    let resolved = state.manager.resolve_path(&PathBuf::from(path)).map_err(ApiError::from)?;
    let content = state.manager.read_log_file_from_tail(&resolved, lines).map_err(ApiError::from)?;
    Ok(Json(content))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryParams {
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub levels: Option<String>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_search_limit")]
    pub limit: u64,
}

fn default_search_limit() -> u64 {
    50
}

/// `GET /api/search`
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let start_time = parse_rfc3339_millis(params.start_time.as_deref())?;
    let end_time = parse_rfc3339_millis(params.end_time.as_deref())?;
    let levels = params
        .levels
        .as_deref()
        .map(|s| s.split(',').map(str::to_owned).collect())
        .unwrap_or_default();

    let resolved = state.manager.resolve_path(PathBuf::from(&params.path).as_path()).map_err(ApiError::from)?;
    let query = SearchQuery {
        path: resolved.to_string_lossy().into_owned(),
        query: params.query,
        is_regex: params.is_regex,
        start_time,
        end_time,
        levels,
        offset: params.offset,
        limit: params.limit.clamp(1, 500),
    };

    let result = state.search.search(&query).map_err(ApiError::from)?;
    Ok(Json(result))
}

fn parse_rfc3339_millis(raw: Option<&str>) -> ApiResult<i64> {
    let Some(raw) = raw else { return Ok(0) };
    if raw.is_empty() {
        return Ok(0);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| ApiError::from(sentry_core::SentryError::InvalidTimeFormat(e.to_string())))
}
