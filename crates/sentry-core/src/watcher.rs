// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FileWatcher: OS-level file event source with coalescing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use parking_lot::Mutex;

use crate::error::{Result, SentryError};

/// The coalescing window events within which collapse to a single `Modify`.
const COALESCE_WINDOW: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Create,
    Modify,
    Delete,
}

#[derive(Debug, Clone)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

type Callback = Arc<dyn Fn(FileEvent) + Send + Sync>;

/// Wraps a debounced `notify` watcher. One instance is shared by
/// `LogManager` for every watched path; per-path callbacks are dispatched
/// from a single underlying OS watcher.
pub struct FileWatcher {
    debouncer: Mutex<Debouncer<notify::RecommendedWatcher, RecommendedCache>>,
    callbacks: Arc<Mutex<HashMap<PathBuf, Callback>>>,
}

impl FileWatcher {
    pub fn new() -> Result<Self> {
        let callbacks: Arc<Mutex<HashMap<PathBuf, Callback>>> = Arc::new(Mutex::new(HashMap::new()));
        let callbacks_for_handler = Arc::clone(&callbacks);

        let handler = move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    dispatch(&callbacks_for_handler, &event.event);
                }
            }
            Err(errors) => {
                for e in errors {
                    tracing::warn!("file watcher error: {e}");
                }
            }
        };

        let debouncer = new_debouncer(COALESCE_WINDOW, None, handler)
            .map_err(|e| SentryError::Internal(format!("failed to start file watcher: {e}")))?;

        Ok(Self { debouncer: Mutex::new(debouncer), callbacks })
    }

    /// Register `callback` for change events under `path`'s parent
    /// directory and begin watching it. Fails if the path cannot be
    /// resolved or the OS refuses the watch.
    pub fn watch_file(
        &self,
        path: &Path,
        callback: impl Fn(FileEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        let parent = path.parent().unwrap_or(path);
        if !parent.exists() {
            return Err(SentryError::InvalidPath(format!(
                "cannot watch {}: parent {} does not exist",
                path.display(),
                parent.display()
            )));
        }

        self.callbacks.lock().insert(path.to_path_buf(), Arc::new(callback));

        let mut debouncer = self.debouncer.lock();
        debouncer
            .watch(parent, RecursiveMode::NonRecursive)
            .map_err(|e| SentryError::Internal(format!("failed to watch {}: {e}", path.display())))
    }

    /// Stop invoking the callback for `path`. Does not unwatch the parent
    /// directory, since other watched siblings may still need it.
    pub fn unwatch_file(&self, path: &Path) {
        self.callbacks.lock().remove(path);
    }

    /// Stop the watcher. Registered callbacks are dropped; any in-flight
    /// debounced events are discarded.
    pub fn stop(&self) {
        self.callbacks.lock().clear();
    }
}

fn dispatch(callbacks: &Arc<Mutex<HashMap<PathBuf, Callback>>>, event: &notify::Event) {
    use notify::EventKind;

    let kind = match event.kind {
        EventKind::Create(_) => FileEventKind::Create,
        EventKind::Modify(_) => FileEventKind::Modify,
        EventKind::Remove(_) => FileEventKind::Delete,
        _ => return,
    };

    let guard = callbacks.lock();
    for path in &event.paths {
        if let Some(cb) = guard.get(path.as_path()) {
            cb(FileEvent { path: path.clone(), kind });
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
