// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `sentry-server` binary and
//! exercise its HTTP and WebSocket surface over real TCP.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_tungstenite::tungstenite::Message;

use sentry_specs::SentryProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

async fn write_log(dir: &std::path::Path, name: &str, contents: &str) -> anyhow::Result<()> {
    tokio::fs::write(dir.join(name), contents).await?;
    Ok(())
}

// -- HTTP -----------------------------------------------------------------

#[tokio::test]
async fn http_health() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    server.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/health", server.base_url())).await?.json().await?;

    assert_eq!(resp["status"], "ok");
    assert!(resp["uptime"].is_number());

    Ok(())
}

#[tokio::test]
async fn http_version() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    server.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/version", server.base_url())).await?.json().await?;

    assert!(resp["version"].is_string());
    assert!(resp["os"].is_string());

    Ok(())
}

#[tokio::test]
async fn http_list_and_read_log() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    write_log(server.log_dir(), "app.log", "line one\nline two\nline three\n").await?;
    server.wait_healthy(TIMEOUT).await?;

    let files: serde_json::Value =
        reqwest::get(format!("{}/api/logs", server.base_url())).await?.json().await?;
    let roots = files.as_array().expect("log tree is an array");
    assert_eq!(roots.len(), 1);
    let children = roots[0]["children"].as_array().expect("root has children");
    assert!(children.iter().any(|f| f["name"] == "app.log"));

    let content: serde_json::Value =
        reqwest::get(format!("{}/api/logs/app.log", server.base_url())).await?.json().await?;
    let entries = content["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["message"], "line one");

    Ok(())
}

#[tokio::test]
async fn http_tail_log() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    let body: String = (1..=20).map(|n| format!("line {n}\n")).collect();
    write_log(server.log_dir(), "tail.log", &body).await?;
    server.wait_healthy(TIMEOUT).await?;

    let content: serde_json::Value = reqwest::get(format!(
        "{}/api/logs/tail/tail.log?lines=5",
        server.base_url()
    ))
    .await?
    .json()
    .await?;
    let entries = content["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 5);
    assert_eq!(entries.last().unwrap()["message"], "line 20");

    Ok(())
}

#[tokio::test]
async fn http_search() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    write_log(server.log_dir(), "search.log", "alpha\nbravo\nalpha again\n").await?;
    server.wait_healthy(TIMEOUT).await?;

    let result: serde_json::Value = reqwest::get(format!(
        "{}/api/search?path=search.log&query=alpha",
        server.base_url()
    ))
    .await?
    .json()
    .await?;
    let entries = result["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 2);

    Ok(())
}

#[tokio::test]
async fn http_read_missing_log_is_404() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    server.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::get(format!("{}/api/logs/does-not-exist.log", server.base_url())).await?;
    assert_eq!(resp.status().as_u16(), 404);

    Ok(())
}

// -- WebSocket --------------------------------------------------------------

#[tokio::test]
async fn ws_ping_pong() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    server.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url()).await?;
    ws.send(Message::Text(r#"{"type":"ping"}"#.into())).await?;

    let msg = tokio::time::timeout(TIMEOUT, ws.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
    let text = match msg {
        Message::Text(t) => t.to_string(),
        other => anyhow::bail!("expected text ws message, got: {other:?}"),
    };
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(parsed["type"], "pong");

    Ok(())
}

#[tokio::test]
async fn ws_subscribe_receives_append() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    write_log(server.log_dir(), "tail-ws.log", "first\n").await?;
    server.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url()).await?;
    ws.send(Message::Text(r#"{"type":"subscribe","path":"tail-ws.log"}"#.into())).await?;

    let msg = tokio::time::timeout(TIMEOUT, ws.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
    let text = match msg {
        Message::Text(t) => t.to_string(),
        other => anyhow::bail!("expected text ws message, got: {other:?}"),
    };
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(parsed["type"], "subscribed");

    // Append to the watched file and expect a push update.
    tokio::fs::OpenOptions::new()
        .append(true)
        .open(server.log_dir().join("tail-ws.log"))
        .await?
        .write_all(b"second\n")
        .await?;

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("did not receive a log_update frame for the append");
        }
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
        let text = match msg {
            Message::Text(t) => t.to_string(),
            _ => continue,
        };
        let parsed: serde_json::Value = serde_json::from_str(&text)?;
        if parsed["type"] == "log_update" {
            let path = parsed["data"]["path"].as_str().expect("path is a string");
            assert!(path.ends_with("tail-ws.log"), "unexpected path: {path}");
            let entries = parsed["data"]["entries"].as_array().expect("entries array");
            assert!(entries.iter().any(|e| e["message"] == "second"));
            break;
        }
    }

    Ok(())
}

#[tokio::test]
async fn ws_subscribe_to_missing_path_errors() -> anyhow::Result<()> {
    let server = SentryProcess::start().await?;
    server.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url()).await?;
    ws.send(Message::Text(r#"{"type":"subscribe","path":"missing.log"}"#.into())).await?;

    let msg = tokio::time::timeout(TIMEOUT, ws.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
    let text = match msg {
        Message::Text(t) => t.to_string(),
        other => anyhow::bail!("expected text ws message, got: {other:?}"),
    };
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(parsed["type"], "error");

    Ok(())
}
