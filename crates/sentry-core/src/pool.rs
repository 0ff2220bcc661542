// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FilePool: a bounded pool of open file handles per path.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Result, SentryError};

const INITIAL_SIZE: usize = 2;
const MAX_SIZE: usize = 10;
const MAX_IDLE: Duration = Duration::from_secs(30 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(60 * 60);
const READ_BUFFER: usize = 64 * 1024;

/// An open handle with a buffered reader. Invariant: [`FileResource::is_valid`]
/// returns false once the file has been removed from disk.
pub struct FileResource {
    path: PathBuf,
    reader: BufReader<File>,
    opened_at: Instant,
}

impl FileResource {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SentryError::NotFound(path.display().to_string())
            } else {
                SentryError::Io(e)
            }
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(READ_BUFFER, file),
            opened_at: Instant::now(),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.path.exists()
            && self.opened_at.elapsed() < MAX_LIFETIME
    }

    fn idle_expired(&self, idle_since: Instant) -> bool {
        idle_since.elapsed() > MAX_IDLE
    }

    /// Seek to the start and drop any buffered bytes, as required before
    /// reuse.
    pub fn reset(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    pub fn reader(&mut self) -> &mut BufReader<File> {
        &mut self.reader
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct Idle {
    resource: FileResource,
    since: Instant,
}

/// One sub-pool per path, created lazily, bounded [2, 10].
struct SubPool {
    idle: Vec<Idle>,
    outstanding: usize,
}

/// Bounded, per-path file-handle pool.
///
/// Acquisition policy: if the sub-pool is at `MAX_SIZE` with no idle
/// resource, `get` returns a fresh, unpooled [`FileResource`] rather than
/// blocking the caller.
pub struct FilePool {
    pools: Mutex<HashMap<PathBuf, SubPool>>,
    closed: Mutex<bool>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub sub_pools: usize,
    pub idle_total: usize,
    pub outstanding_total: usize,
}

impl Default for FilePool {
    fn default() -> Self {
        Self::new()
    }
}

impl FilePool {
    pub fn new() -> Self {
        Self { pools: Mutex::new(HashMap::new()), closed: Mutex::new(false) }
    }

    /// Acquire a handle for `path`. Reuses an idle, valid resource when
    /// available; otherwise opens a new one.
    pub fn get(&self, path: &Path) -> Result<FileResource> {
        if *self.closed.lock() {
            return Err(SentryError::Internal("file pool is closed".to_owned()));
        }

        let mut pools = self.pools.lock();
        let sub = pools.entry(path.to_path_buf()).or_insert_with(|| SubPool {
            idle: Vec::with_capacity(INITIAL_SIZE),
            outstanding: 0,
        });

        while let Some(idle) = sub.idle.pop() {
            if idle.resource.is_valid() && !idle.resource.idle_expired(idle.since) {
                sub.outstanding += 1;
                return Ok(idle.resource);
            }
            // expired or invalid: drop it and keep looking
        }

        if sub.outstanding < MAX_SIZE {
            sub.outstanding += 1;
        }
        drop(pools);

        FileResource::open(path)
    }

    /// Return a resource to its sub-pool. If the pool is closed or the
    /// sub-pool is already saturated with idle entries, the handle is
    /// simply dropped (closed).
    pub fn put(&self, resource: FileResource) {
        let mut pools = self.pools.lock();
        if *self.closed.lock() {
            return;
        }
        if let Some(sub) = pools.get_mut(resource.path()) {
            sub.outstanding = sub.outstanding.saturating_sub(1);
            if sub.idle.len() < MAX_SIZE {
                sub.idle.push(Idle { resource, since: Instant::now() });
            }
        }
    }

    /// Close every handle in every sub-pool. Subsequent `get` calls fail.
    pub fn close(&self) {
        let mut closed = self.closed.lock();
        *closed = true;
        self.pools.lock().clear();
    }

    pub fn stats(&self) -> PoolStats {
        let pools = self.pools.lock();
        PoolStats {
            sub_pools: pools.len(),
            idle_total: pools.values().map(|s| s.idle.len()).sum(),
            outstanding_total: pools.values().map(|s| s.outstanding).sum(),
        }
    }

    /// Evict idle entries past their max-idle time. Intended to be driven
    /// by a periodic sweeper task.
    pub fn sweep(&self) {
        let mut pools = self.pools.lock();
        for sub in pools.values_mut() {
            sub.idle.retain(|idle| !idle.resource.idle_expired(idle.since) && idle.resource.is_valid());
        }
    }
}

/// RAII guard that always returns its resource to the pool on drop,
/// including on panics/early returns.
pub struct PoolGuard<'a> {
    pool: &'a FilePool,
    resource: Option<FileResource>,
}

impl<'a> PoolGuard<'a> {
    pub fn acquire(pool: &'a FilePool, path: &Path) -> Result<Self> {
        let resource = pool.get(path)?;
        Ok(Self { pool, resource: Some(resource) })
    }
}

impl std::ops::Deref for PoolGuard<'_> {
    type Target = FileResource;
    // `resource` is only ever `None` after `Drop::drop` has run, at which
    // point the guard is gone; every live `&PoolGuard` has one.
    #[allow(clippy::expect_used)]
    fn deref(&self) -> &FileResource {
        self.resource.as_ref().expect("resource present until drop")
    }
}

impl std::ops::DerefMut for PoolGuard<'_> {
    #[allow(clippy::expect_used)]
    fn deref_mut(&mut self) -> &mut FileResource {
        self.resource.as_mut().expect("resource present until drop")
    }
}

impl Drop for PoolGuard<'_> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.put(resource);
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
