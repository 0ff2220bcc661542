// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the log inspection service: one
//! `Router`, routes grouped by concern, a single ambient middleware
//! layer, CORS.

pub mod auth;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` with every route of the log inspection API.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(http::health))
        .route("/api/version", get(http::version))
        .route("/api/stats", get(http::stats))
        .route("/api/logs", get(http::list_logs))
        .route("/api/logs/tail/{*path}", get(http::tail_log))
        .route("/api/logs/{*path}", get(http::read_log))
        .route("/api/search", get(http::search))
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::allowed_ips_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
