// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use super::*;

fn manager_for(dir: &Path) -> Arc<LogManager> {
    LogManager::new(LogManagerConfig {
        roots: vec![dir.to_path_buf()],
        max_file_size: 10 * 1024 * 1024,
        cache_memory_cap_bytes: 100 * 1024 * 1024,
    })
    .unwrap()
}

#[test]
fn discovery_admits_and_filters_by_rule() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.log"), "x\n").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("err.log"), "y\n").unwrap();
    std::fs::write(dir.path().join("notes.md"), "skip\n").unwrap();

    let manager = manager_for(dir.path());
    let tree = manager.get_log_files().unwrap();
    assert_eq!(tree.len(), 1);
    let root = &tree[0];
    assert!(root.is_directory);
    let children = root.children.as_ref().unwrap();
    assert_eq!(children.len(), 2);
}

#[test]
fn read_log_file_assigns_sequential_line_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let mut f = std::fs::File::create(&path).unwrap();
    for i in 0..10 {
        writeln!(f, "line {i}").unwrap();
    }

    let manager = manager_for(dir.path());
    let content = manager.read_log_file(&path, 2, 3).unwrap();
    assert_eq!(content.entries.len(), 3);
    assert_eq!(content.entries[0].line_num, 2);
    assert_eq!(content.entries[1].line_num, 3);
    assert_eq!(content.entries[2].line_num, 4);
    assert!(content.has_more);
}

#[test]
fn read_log_file_from_tail_returns_last_n_with_offset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.log");
    let mut f = std::fs::File::create(&path).unwrap();
    for i in 0..200 {
        writeln!(f, r#"10.0.0.1 - - [10/Oct/2023:13:55:{i:02} -0700] "GET / HTTP/1.1" 200 10"#).unwrap();
    }

    let manager = manager_for(dir.path());
    let content = manager.read_log_file_from_tail(&path, 50).unwrap();
    assert_eq!(content.entries.len(), 50);
    assert_eq!(content.offset, 150);
    assert_eq!(content.entries[0].line_num, 150);
    assert_eq!(content.entries[49].line_num, 199);
    assert!(content.has_more);
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_file_emits_append_for_new_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.log");
    std::fs::write(&path, "").unwrap();

    let manager = manager_for(dir.path());
    let mut rx = manager.watch_file(&path).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "line1").unwrap();
        writeln!(f, "line2").unwrap();
        writeln!(f, "line3").unwrap();
    }

    let update = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.update_type, UpdateType::Append);
    assert_eq!(update.entries.len(), 3);
    assert!(update.entries.iter().all(|e| e.line_num == -1));
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_file_twice_returns_subscribers_of_same_channel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.log");
    std::fs::write(&path, "").unwrap();

    let manager = manager_for(dir.path());
    let _rx1 = manager.watch_file(&path).unwrap();
    let mut rx2 = manager.watch_file(&path).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "hello").unwrap();
    }

    let update = tokio::time::timeout(std::time::Duration::from_secs(5), rx2.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.entries.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn truncation_resets_cursor_to_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.log");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        for i in 0..20 {
            writeln!(f, "line {i}").unwrap();
        }
    }

    let manager = manager_for(dir.path());
    let mut rx = manager.watch_file(&path).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // Truncate then append 2 new lines.
    std::fs::write(&path, "").unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f, "new1").unwrap();
        writeln!(f, "new2").unwrap();
    }

    let update = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.entries.len(), 2);
}

#[test]
fn stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_for(dir.path());
    manager.start().unwrap();
    manager.stop();
    manager.stop();
}

#[test]
fn critical_pressure_clears_the_format_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    std::fs::write(&path, r#"{"level":"info","message":"x"}"#.to_owned() + "\n").unwrap();

    let manager = manager_for(dir.path());
    manager.read_log_file(&path, 0, 1).unwrap();
    // Driving the monitor straight to critical pressure should cascade into
    // the parser registry's format cache via the same on_transition callback
    // LogManager::new wires up, not just the page/search caches CacheLayer
    // owns directly.
    manager.cache.monitor.sample(u64::MAX);
    assert_eq!(manager.cache.monitor.level(), crate::cache::PressureLevel::Critical);

    let content = manager.read_log_file(&path, 0, 1).unwrap();
    assert_eq!(content.entries.len(), 1);
}
