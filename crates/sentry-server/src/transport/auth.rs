// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `allowedIPs` ambient gate: a source-IP/CIDR check applied as request
//! middleware. Authentication proper (`enableAuth`/username and password)
//! is validated at startup by `ResolvedConfig::validate` but has no
//! request-level enforcement here beyond this thin pass-through layer.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorBody;
use crate::state::AppState;

/// `/api/health` is exempt from the allowlist check.
const EXEMPT_PATHS: &[&str] = &["/api/health"];

pub async fn allowed_ips_layer(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if state.config.allowed_ips.is_empty() {
        return next.run(req).await;
    }
    if EXEMPT_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    if is_allowed(addr.ip(), &state.config.allowed_ips) {
        return next.run(req).await;
    }

    let body = ErrorBody {
        code: "PERMISSION_DENIED",
        message: format!("{} is not in the allowed IP list", addr.ip()),
        details: None,
    };
    (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
}

fn is_allowed(peer: IpAddr, allowed: &[String]) -> bool {
    allowed.iter().any(|rule| matches_rule(peer, rule))
}

fn matches_rule(peer: IpAddr, rule: &str) -> bool {
    if let Some((network, prefix_len)) = rule.split_once('/') {
        return match (peer, network.parse::<IpAddr>()) {
            (IpAddr::V4(peer), Ok(IpAddr::V4(network))) => {
                matches_cidr_v4(peer, network, prefix_len)
            }
            (IpAddr::V6(peer), Ok(IpAddr::V6(network))) => {
                matches_cidr_v6(peer, network, prefix_len)
            }
            _ => false,
        };
    }

    rule.parse::<IpAddr>().map(|configured| configured == peer).unwrap_or(false)
}

fn matches_cidr_v4(peer: std::net::Ipv4Addr, network: std::net::Ipv4Addr, prefix_len: &str) -> bool {
    let Ok(prefix) = prefix_len.parse::<u32>() else { return false };
    if prefix > 32 {
        return false;
    }
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    (u32::from(peer) & mask) == (u32::from(network) & mask)
}

fn matches_cidr_v6(peer: std::net::Ipv6Addr, network: std::net::Ipv6Addr, prefix_len: &str) -> bool {
    let Ok(prefix) = prefix_len.parse::<u32>() else { return false };
    if prefix > 128 {
        return false;
    }
    let mask = if prefix == 0 { 0 } else { u128::MAX << (128 - prefix) };
    (u128::from(peer) & mask) == (u128::from(network) & mask)
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
