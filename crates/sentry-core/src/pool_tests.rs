// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn get_put_roundtrip_reuses_resource() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "hello\n").unwrap();

    let pool = FilePool::new();
    let resource = pool.get(&path).unwrap();
    pool.put(resource);
    let stats = pool.stats();
    assert_eq!(stats.idle_total, 1);

    let _again = pool.get(&path).unwrap();
    let stats = pool.stats();
    assert_eq!(stats.idle_total, 0);
    assert_eq!(stats.outstanding_total, 1);
}

#[test]
fn get_beyond_max_size_returns_unpooled_resource() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "hello\n").unwrap();

    let pool = FilePool::new();
    let mut held = Vec::new();
    for _ in 0..(MAX_SIZE + 3) {
        held.push(pool.get(&path).unwrap());
    }
    assert_eq!(held.len(), MAX_SIZE + 3);
}

#[test]
fn close_rejects_further_gets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "hello\n").unwrap();

    let pool = FilePool::new();
    pool.close();
    assert!(pool.get(&path).is_err());
}

#[test]
fn guard_returns_resource_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.log");
    std::fs::write(&path, "hello\n").unwrap();

    let pool = FilePool::new();
    {
        let _guard = PoolGuard::acquire(&pool, &path).unwrap();
    }
    assert_eq!(pool.stats().idle_total, 1);
}

#[test]
fn get_missing_file_is_not_found() {
    let pool = FilePool::new();
    let err = pool.get(Path::new("/no/such/file.log")).unwrap_err();
    assert_eq!(err.http_status(), 404);
}
