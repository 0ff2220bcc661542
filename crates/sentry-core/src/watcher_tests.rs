// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use super::*;

#[tokio::test]
async fn watch_file_fires_on_modify() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("app.log");
    std::fs::write(&path, "line1\n")?;

    let watcher = FileWatcher::new()?;
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    watcher.watch_file(&path, move |ev| {
        if ev.kind == FileEventKind::Modify {
            h.fetch_add(1, Ordering::SeqCst);
        }
    })?;

    tokio::time::sleep(StdDuration::from_millis(100)).await;
    std::fs::write(&path, "line1\nline2\n")?;

    tokio::time::sleep(StdDuration::from_millis(500)).await;
    assert!(hits.load(Ordering::SeqCst) >= 1);
    Ok(())
}

#[test]
fn watch_file_rejects_missing_parent() {
    let watcher = FileWatcher::new().unwrap();
    let missing = PathBuf::from("/no/such/dir/app.log");
    assert!(watcher.watch_file(&missing, |_| {}).is_err());
}
