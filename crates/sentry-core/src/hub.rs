// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SubscriptionHub: fan-out of `LogUpdate`s from N `LogManager` watch
//! channels to M WebSocket clients, each subscribed to a set of paths.
//!
//! N upstreams (one broadcast channel per watched file) feed M downstream
//! clients, filtered by per-client path subscription. Ping/pong and the
//! write deadline are connection-level concerns and live in the transport
//! layer that owns the socket, not here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, SentryError};
use crate::manager::LogManager;
use crate::model::{ServerMessage, SubscribedData};

/// Bound on a client's outbound queue.
const CLIENT_QUEUE_CAPACITY: usize = 256;

pub type ClientId = Uuid;

struct Subscription {
    resolved: PathBuf,
    cancel: CancellationToken,
}

struct ClientSlot {
    tx: mpsc::Sender<ServerMessage>,
    subscriptions: HashMap<String, Subscription>,
}

/// Multiplexes watched-file updates to registered clients.
///
/// The hub itself holds no cooperative main-loop task: registration and
/// subscription bookkeeping are plain locked-map operations, and each
/// (client, path) subscription gets its own fanout task forwarding from the
/// path's broadcast channel to the client's send queue. This keeps
/// per-subscription cancellation and back-pressure independent without
/// funneling every event through one serialized loop.
pub struct SubscriptionHub {
    manager: Arc<LogManager>,
    clients: RwLock<HashMap<ClientId, ClientSlot>>,
    messages_dropped: AtomicU64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub clients: usize,
    pub subscriptions: usize,
    pub messages_dropped: u64,
    /// Fraction of total client-queue capacity currently occupied,
    /// sampled at call time.
    pub broadcast_utilization: f64,
}

impl SubscriptionHub {
    pub fn new(manager: Arc<LogManager>) -> Arc<Self> {
        Arc::new(Self {
            manager,
            clients: RwLock::new(HashMap::new()),
            messages_dropped: AtomicU64::new(0),
        })
    }

    /// Register a new client, returning its id and the receiving half of
    /// its send queue.
    pub async fn register_client(&self) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        self.clients.write().await.insert(id, ClientSlot { tx, subscriptions: HashMap::new() });
        (id, rx)
    }

    /// Unregister a client, cancelling every fanout task it owns.
    pub async fn unregister_client(&self, id: ClientId) {
        if let Some(slot) = self.clients.write().await.remove(&id) {
            for sub in slot.subscriptions.into_values() {
                sub.cancel.cancel();
            }
        }
    }

    /// Subscribe `client_id` to `requested`, replacing any prior
    /// subscription for the same requested path. Pushes `subscribed` onto
    /// the client's queue on success.
    pub async fn subscribe(self: &Arc<Self>, client_id: ClientId, requested: &str) -> Result<()> {
        let resolved = self.manager.resolve_path(Path::new(requested))?;
        let receiver = self.manager.watch_file(&resolved)?;

        let tx = {
            let mut clients = self.clients.write().await;
            let Some(slot) = clients.get_mut(&client_id) else {
                return Err(SentryError::Internal("unknown client".to_owned()));
            };

            if let Some(old) = slot.subscriptions.remove(requested) {
                old.cancel.cancel();
            }

            let cancel = CancellationToken::new();
            slot.subscriptions
                .insert(requested.to_owned(), Subscription { resolved: resolved.clone(), cancel: cancel.clone() });

            self.spawn_fanout(client_id, resolved.clone(), receiver, cancel);
            slot.tx.clone()
        };

        let data = SubscribedData { path: resolved.to_string_lossy().into_owned() };
        self.deliver(&tx, ServerMessage::Subscribed { data }).await;
        Ok(())
    }

    /// Unsubscribe `client_id` from `requested`. Pushes `unsubscribed` on
    /// success; a no-op (no error) if there was no such subscription.
    pub async fn unsubscribe(&self, client_id: ClientId, requested: &str) {
        let tx_and_path = {
            let mut clients = self.clients.write().await;
            let Some(slot) = clients.get_mut(&client_id) else { return };
            let Some(sub) = slot.subscriptions.remove(requested) else { return };
            sub.cancel.cancel();
            Some((slot.tx.clone(), sub.resolved))
        };

        if let Some((tx, resolved)) = tx_and_path {
            let data = SubscribedData { path: resolved.to_string_lossy().into_owned() };
            self.deliver(&tx, ServerMessage::Unsubscribed { data }).await;
        }
    }

    /// Forward every `LogUpdate` on `receiver` to `client_id`'s queue until
    /// the subscription or the client closes. Writes are non-blocking: a
    /// full queue drops the message and increments the drop counter.
    fn spawn_fanout(
        self: &Arc<Self>,
        client_id: ClientId,
        resolved: PathBuf,
        mut receiver: tokio::sync::broadcast::Receiver<crate::model::LogUpdate>,
        cancel: CancellationToken,
    ) {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    update = receiver.recv() => {
                        match update {
                            Ok(update) => hub.try_deliver_update(client_id, update).await,
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(path = %resolved.display(), skipped, "subscriber lagged, dropping skipped updates");
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                        }
                    }
                }
            }
        });
    }

    async fn try_deliver_update(&self, client_id: ClientId, update: crate::model::LogUpdate) {
        let tx = {
            let clients = self.clients.read().await;
            match clients.get(&client_id) {
                Some(slot) => slot.tx.clone(),
                None => return,
            }
        };

        if tx.try_send(ServerMessage::LogUpdate { data: update }).is_err() {
            self.messages_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Deliver a direct reply (subscribed/unsubscribed/error) to a
    /// client's own queue, same non-blocking discipline as broadcast
    /// delivery.
    async fn deliver(&self, tx: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
        if tx.try_send(message).is_err() {
            self.messages_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn stats(&self) -> HubStats {
        let clients = self.clients.read().await;
        let total_capacity = clients.len() * CLIENT_QUEUE_CAPACITY;
        let used: usize = clients.values().map(|s| CLIENT_QUEUE_CAPACITY - s.tx.capacity()).sum();
        let subscriptions = clients.values().map(|s| s.subscriptions.len()).sum();

        HubStats {
            clients: clients.len(),
            subscriptions,
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            broadcast_utilization: if total_capacity == 0 {
                0.0
            } else {
                used as f64 / total_capacity as f64
            },
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
