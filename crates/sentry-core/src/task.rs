// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Panic-isolated background task supervision.
//!
//! A panic in any background task must be caught, logged, and the task
//! restarted rather than taking the process down. `tokio::spawn` already
//! isolates panics into the `JoinHandle`; this wraps that with a restart
//! loop so callers get a fire-and-forget task, minus the "if it dies, the
//! feature silently stops working" failure mode.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Spawn `make_future` repeatedly until `shutdown` is cancelled. Each
/// invocation gets a fresh future (so retried state, e.g. a reconnecting
/// socket, is reconstructed cleanly) via `make_future`, a zero-argument
/// factory rather than a single future, because a panicked future cannot be
/// resumed.
pub fn supervise<F, Fut>(name: &'static str, shutdown: CancellationToken, make_future: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let task = tokio::spawn(make_future());
            tokio::select! {
                _ = shutdown.cancelled() => return,
                result = task => {
                    match result {
                        Ok(()) => return,
                        Err(e) if e.is_panic() => {
                            tracing::error!(task = name, "background task panicked, restarting: {e}");
                            continue;
                        }
                        Err(_) => return,
                    }
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
