// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/ws` — real-time log tail protocol. Each connection registers its own
//! `SubscriptionHub` client and drives subscribe/unsubscribe/ping frames
//! over a single bridge loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use sentry_core::ClientId;

use crate::state::AppState;

/// Server ping cadence and pong deadline.
const PING_INTERVAL: Duration = Duration::from_secs(54);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);
/// Per-frame write deadline.
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
/// Largest incoming control frame accepted.
const MAX_MESSAGE_BYTES: usize = 4 * 1024;

/// `GET /ws`
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (client_id, mut queue_rx) = state.hub.register_client().await;
    let (mut sink, mut stream) = socket.split();

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // first tick fires immediately; consume it
    let mut awaiting_pong: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            message = queue_rx.recv() => {
                match message {
                    Some(msg) => {
                        if send_with_deadline(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let text = text.to_string();
                        if text.len() > MAX_MESSAGE_BYTES {
                            send_error(&mut sink, "INVALID_INPUT", "message exceeds 4 KiB").await;
                            continue;
                        }
                        if handle_client_frame(&state, client_id, &text, &mut sink, &mut awaiting_pong).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        awaiting_pong = None;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }

            _ = ping_interval.tick() => {
                if let Some(since) = awaiting_pong {
                    if since.elapsed() > PONG_TIMEOUT {
                        tracing::info!(%client_id, "client missed pong deadline, closing");
                        break;
                    }
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                awaiting_pong = Some(tokio::time::Instant::now());
            }
        }
    }

    state.hub.unregister_client(client_id).await;
}

async fn handle_client_frame(
    state: &Arc<AppState>,
    client_id: ClientId,
    text: &str,
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    awaiting_pong: &mut Option<tokio::time::Instant>,
) -> Result<(), ()> {
    let parsed: Result<sentry_core::model::ClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(sentry_core::model::ClientMessage::Subscribe { path }) => {
            if let Err(e) = state.hub.subscribe(client_id, &path).await {
                send_error(sink, e.code().as_str(), &e.to_string()).await;
            }
        }
        Ok(sentry_core::model::ClientMessage::Unsubscribe { path }) => {
            state.hub.unsubscribe(client_id, &path).await;
        }
        Ok(sentry_core::model::ClientMessage::Ping) => {
            *awaiting_pong = None;
            let pong = sentry_core::model::ServerMessage::Pong {
                data: sentry_core::model::PongData { timestamp: chrono::Utc::now().timestamp() },
            };
            return send_with_deadline(sink, &pong).await.map_err(|_| ());
        }
        Err(e) => {
            send_error(sink, "INVALID_INPUT", &format!("malformed control frame: {e}")).await;
        }
    }
    Ok(())
}

async fn send_with_deadline(
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    message: &sentry_core::model::ServerMessage,
) -> Result<(), ()> {
    let Ok(text) = serde_json::to_string(message) else { return Err(()) };
    tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(text.into())))
        .await
        .map_err(|_| ())?
        .map_err(|_| ())
}

async fn send_error(
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    code: &str,
    message: &str,
) {
    let err = sentry_core::model::ServerMessage::Error {
        data: sentry_core::model::ErrorData { code: code.to_owned(), message: message.to_owned() },
    };
    let _ = send_with_deadline(sink, &err).await;
}
