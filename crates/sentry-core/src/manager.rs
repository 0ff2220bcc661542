// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LogManager: discovery, tail/page reads, and the tail-cursor state
//! machine that feeds `SubscriptionHub`.

use std::collections::HashMap;
use std::io::{BufRead, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use crate::cache::CacheLayer;
use crate::error::{Result, SentryError};
use crate::model::{LogContent, LogEntry, LogFile, LogUpdate, UpdateType};
use crate::parser::ParserRegistry;
use crate::pool::{FilePool, PoolGuard};
use crate::watcher::{FileEventKind, FileWatcher};

/// Recognized log file extensions.
const LOG_EXTENSIONS: &[&str] = &["log", "out", "err"];
/// Extensions eligible for the name-contains-keyword fallback rule.
const LOOSE_EXTENSIONS: &[&str] = &["txt", "json"];
const NAME_KEYWORDS: &[&str] = &["log", "access", "error", "debug", "info", "warn"];

/// The broadcast channel capacity backing each watched file's update
/// stream.
const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Bytes-per-line estimate used to seek near the tail without a full scan.
const TAIL_BYTES_PER_LINE_ESTIMATE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    WatchedIdle,
    WatchedReading,
    Truncated,
    Deleted,
}

struct WatchEntry {
    /// Guards the byte offset and serializes reads of this path; held
    /// across the file I/O it protects.
    cursor: AsyncMutex<u64>,
    state: SyncMutex<WatchState>,
    sender: broadcast::Sender<LogUpdate>,
}

pub struct LogManagerConfig {
    pub roots: Vec<PathBuf>,
    pub max_file_size: u64,
    pub cache_memory_cap_bytes: u64,
}

pub struct LogManager {
    roots: Vec<PathBuf>,
    max_file_size: u64,
    parsers: Arc<ParserRegistry>,
    pub cache: Arc<CacheLayer>,
    pool: Arc<FilePool>,
    watcher: Arc<FileWatcher>,
    watches: SyncMutex<HashMap<PathBuf, Arc<WatchEntry>>>,
    started: AtomicBool,
    shutdown: CancellationToken,
}

impl LogManager {
    pub fn new(config: LogManagerConfig) -> Result<Arc<Self>> {
        let monitor = crate::cache::MemoryMonitor::new(config.cache_memory_cap_bytes);
        let parsers = Arc::new(ParserRegistry::new());
        let cache = CacheLayer::new(monitor);

        // The format cache is the third of the three caches that must go
        // empty together under critical pressure; `CacheLayer` only owns
        // the page/search caches, so its callback can't clear this one.
        let parsers_for_pressure = Arc::clone(&parsers);
        cache.monitor.on_transition(move |level| {
            if level == crate::cache::PressureLevel::Critical {
                parsers_for_pressure.clear();
            }
        });

        Ok(Arc::new(Self {
            roots: config.roots,
            max_file_size: config.max_file_size,
            parsers,
            cache,
            pool: Arc::new(FilePool::new()),
            watcher: Arc::new(FileWatcher::new()?),
            watches: SyncMutex::new(HashMap::new()),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }))
    }

    /// Start background tasks. Errors if called twice.
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SentryError::Internal("LogManager already started".to_owned()));
        }
        self.cache.monitor.spawn_sampler(self.shutdown.clone());

        let pool = Arc::clone(&self.pool);
        let shutdown = self.shutdown.clone();
        crate::task::supervise("file-pool-sweeper", shutdown.clone(), move || {
            let pool = Arc::clone(&pool);
            let shutdown = shutdown.clone();
            async move {
                let mut interval = tokio::time::interval(std::time::Duration::from_secs(5 * 60));
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = interval.tick() => pool.sweep(),
                    }
                }
            }
        });

        tracing::info!(roots = ?self.roots, "log manager started");
        Ok(())
    }

    /// Stop every background task, close the pool, drop watch state.
    /// Idempotent.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        self.watcher.stop();
        self.pool.close();
        self.cache.clear();
        self.parsers.clear();
        self.watches.lock().clear();
        tracing::info!("log manager stopped");
    }

    fn is_admitted(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { return false };
        if name.starts_with('.') {
            return false;
        }

        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        let lower_name = name.to_ascii_lowercase();

        match ext.as_deref() {
            Some(e) if LOG_EXTENSIONS.contains(&e) => true,
            Some(e) if LOOSE_EXTENSIONS.contains(&e) => {
                NAME_KEYWORDS.iter().any(|k| lower_name.contains(k))
            }
            None => NAME_KEYWORDS.iter().any(|k| lower_name.contains(k)),
            _ => false,
        }
    }

    fn to_log_file(&self, path: &Path) -> Option<LogFile> {
        let meta = std::fs::metadata(path).ok()?;
        if meta.len() > self.max_file_size {
            return None;
        }
        let mod_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Some(LogFile {
            path: path.to_string_lossy().into_owned(),
            name: path.file_name()?.to_string_lossy().into_owned(),
            size: meta.len(),
            mod_time,
            is_directory: false,
            children: None,
        })
    }

    /// Recursively walk every configured root and assemble a tree mirroring
    /// the directory structure, sorted by path.
    pub fn get_log_files(&self) -> Result<Vec<LogFile>> {
        let mut roots_out = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            if let Some(tree) = self.build_tree(root) {
                roots_out.push(tree);
            }
        }
        Ok(roots_out)
    }

    fn build_tree(&self, dir: &Path) -> Option<LogFile> {
        let meta = std::fs::metadata(dir).ok()?;
        if !meta.is_dir() {
            return self.to_log_file(dir);
        }

        let mut entries: Vec<std::fs::DirEntry> = std::fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut children = Vec::new();
        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                if let Some(child) = self.build_tree(&path) {
                    children.push(child);
                }
            } else if self.is_admitted(&path) {
                if let Some(lf) = self.to_log_file(&path) {
                    children.push(lf);
                }
            }
        }

        Some(LogFile {
            path: dir.to_string_lossy().into_owned(),
            name: dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            size: 0,
            mod_time: 0,
            is_directory: true,
            children: if children.is_empty() { None } else { Some(children) },
        })
    }

    /// One-level listing of `dir` for lazy tree loading.
    pub fn get_directory_files(&self, dir: &Path) -> Result<Vec<LogFile>> {
        let mut entries: Vec<std::fs::DirEntry> = std::fs::read_dir(dir)
            .map_err(|_| SentryError::NotFound(dir.display().to_string()))?
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut out = Vec::new();
        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                out.push(LogFile {
                    path: path.to_string_lossy().into_owned(),
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size: 0,
                    mod_time: 0,
                    is_directory: true,
                    children: None,
                });
            } else if self.is_admitted(&path) {
                if let Some(lf) = self.to_log_file(&path) {
                    out.push(lf);
                }
            }
        }
        Ok(out)
    }

    pub fn get_log_paths(&self) -> Vec<String> {
        fn collect(node: &LogFile, out: &mut Vec<String>) {
            if node.is_directory {
                if let Some(children) = &node.children {
                    for c in children {
                        collect(c, out);
                    }
                }
            } else {
                out.push(node.path.clone());
            }
        }
        let mut out = Vec::new();
        if let Ok(tree) = self.get_log_files() {
            for root in &tree {
                collect(root, &mut out);
            }
        }
        out
    }

    fn sample_lines(path: &Path, count: usize) -> Vec<String> {
        let Ok(file) = std::fs::File::open(path) else { return Vec::new() };
        let reader = std::io::BufReader::new(file);
        reader
            .lines()
            .map_while(std::result::Result::ok)
            .filter(|l| !l.trim().is_empty())
            .take(count)
            .collect()
    }

    fn validate_readable(&self, path: &Path) -> Result<std::fs::Metadata> {
        let meta = std::fs::metadata(path)
            .map_err(|_| SentryError::NotFound(path.display().to_string()))?;
        if meta.len() > self.max_file_size {
            return Err(SentryError::FileTooLarge(path.display().to_string()));
        }
        Ok(meta)
    }

    /// Read `limit` lines starting at `offset`.
    pub fn read_log_file(&self, path: &Path, offset: u64, limit: u64) -> Result<LogContent> {
        let meta = self.validate_readable(path)?;
        let mod_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let path_str = path.to_string_lossy().into_owned();
        let cache_key = CacheLayer::page_key(&path_str, offset, limit, mod_time);
        if let Some(cached) = self.cache.get_page(&cache_key) {
            return Ok(cached);
        }

        let parser = self.parsers.detect(&path_str, &Self::sample_lines(path, 10));

        let mut guard = PoolGuard::acquire(&self.pool, path)?;
        guard.reset()?;

        let total_lines = count_lines(guard.reader())?;
        guard.reset()?;

        let mut entries = Vec::new();
        let mut lines = guard.reader().lines();
        for _ in 0..offset {
            if lines.next().is_none() {
                break;
            }
        }

        for i in 0..limit {
            match lines.next() {
                Some(Ok(line)) => {
                    entries.push(self.parsers.parse_with_fallback(
                        parser.as_ref(),
                        &line,
                        (offset + i) as i64,
                    ));
                }
                _ => break,
            }
        }
        let has_more = lines.next().is_some();

        let content = LogContent { entries, total_lines, has_more, offset };
        if !self.cache.monitor.is_memory_pressure() {
            self.cache.put_page(cache_key, content.clone());
        }
        Ok(content)
    }

    /// Stream every entry in `path` from the start, invoking `visit` for
    /// each one in order. Stops early as soon as `visit` returns `false`,
    /// so a caller that only needs the first N matches never pays for a
    /// full-file scan. Used by search, which needs every line considered
    /// rather than a bounded page of raw lines.
    pub fn scan_entries<F>(&self, path: &Path, mut visit: F) -> Result<()>
    where
        F: FnMut(LogEntry) -> bool,
    {
        self.validate_readable(path)?;
        let path_str = path.to_string_lossy().into_owned();
        let parser = self.parsers.detect(&path_str, &Self::sample_lines(path, 10));

        let mut guard = PoolGuard::acquire(&self.pool, path)?;
        guard.reset()?;

        for (i, line) in guard.reader().lines().enumerate() {
            let entry = self.parsers.parse_with_fallback(parser.as_ref(), &line?, i as i64);
            if !visit(entry) {
                break;
            }
        }
        Ok(())
    }

    /// Read the last `lines` lines of `path`.
    pub fn read_log_file_from_tail(&self, path: &Path, lines: u64) -> Result<LogContent> {
        let meta = self.validate_readable(path)?;
        let size = meta.len();
        let path_str = path.to_string_lossy().into_owned();
        let parser = self.parsers.detect(&path_str, &Self::sample_lines(path, 10));

        let (collected, total_lines) = Self::tail_scan(path, size, lines)?;
        let returned = collected.len() as u64;
        let base = total_lines.saturating_sub(returned);

        let entries: Vec<LogEntry> = collected
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                self.parsers.parse_with_fallback(parser.as_ref(), &line, (base + i as u64) as i64)
            })
            .collect();

        Ok(LogContent {
            entries,
            total_lines,
            has_more: base > 0,
            offset: base,
        })
    }

    /// Seek near the tail, read to EOF, keep the final `lines`. Widen once
    /// if the first attempt under-collects and didn't already start at 0.
    fn tail_scan(path: &Path, size: u64, lines: u64) -> Result<(Vec<String>, u64)> {
        let mut multiplier = 1u64;
        loop {
            let window = 2 * lines * TAIL_BYTES_PER_LINE_ESTIMATE * multiplier;
            let start = size.saturating_sub(window);

            let mut file = std::fs::File::open(path)?;
            file.seek(SeekFrom::Start(start))?;
            let mut contents = String::new();
            file.read_to_string(&mut contents).unwrap_or_default();

            let mut collected: Vec<String> = contents.lines().map(str::to_owned).collect();
            // Drop the first (possibly partial) line unless we started at
            // byte 0.
            if start > 0 && !collected.is_empty() {
                collected.remove(0);
            }

            if collected.len() as u64 >= lines || start == 0 || multiplier > 1 {
                let total_lines = collected.len() as u64; // best-effort total (monotonic within this read)
                let keep = collected.split_off(collected.len().saturating_sub(lines as usize));
                return Ok((keep, total_lines.max(keep.len() as u64)));
            }
            multiplier *= 2;
        }
    }

    // -- Tail cursor / watch --------------------------------------------

    fn normalize(path: &Path) -> Result<PathBuf> {
        std::fs::canonicalize(path).or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                Err(SentryError::InvalidPath(path.display().to_string()))
            }
        })
    }

    /// Install (or return the existing) watch for `path`. The first call
    /// per path initializes the cursor to the current file size, so only
    /// content written after the watch begins is streamed.
    pub fn watch_file(
        self: &Arc<Self>,
        path: &Path,
    ) -> Result<broadcast::Receiver<LogUpdate>> {
        let normalized = Self::normalize(path)?;

        {
            let watches = self.watches.lock();
            if let Some(entry) = watches.get(&normalized) {
                return Ok(entry.sender.subscribe());
            }
        }

        let size = std::fs::metadata(&normalized).map(|m| m.len()).unwrap_or(0);
        let (sender, receiver) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let entry = Arc::new(WatchEntry {
            cursor: AsyncMutex::new(size),
            state: SyncMutex::new(WatchState::WatchedIdle),
            sender,
        });

        self.watches.lock().insert(normalized.clone(), Arc::clone(&entry));

        let manager = Arc::clone(self);
        let watch_path = normalized.clone();
        let handle = tokio::runtime::Handle::current();
        self.watcher.watch_file(&normalized, move |event| {
            let manager = Arc::clone(&manager);
            let watch_path = watch_path.clone();
            handle.spawn(async move {
                manager.handle_file_event(&watch_path, event.kind).await;
            });
        })?;

        Ok(receiver)
    }

    async fn handle_file_event(self: &Arc<Self>, path: &Path, kind: FileEventKind) {
        let Some(entry) = self.watches.lock().get(path).cloned() else { return };

        match kind {
            FileEventKind::Delete => {
                *entry.state.lock() = WatchState::Deleted;
                self.parsers.invalidate(&path.to_string_lossy());
                self.cache.invalidate_path(&path.to_string_lossy());
                let _ = entry.sender.send(LogUpdate {
                    path: path.to_string_lossy().into_owned(),
                    entries: vec![],
                    update_type: UpdateType::Delete,
                });
            }
            FileEventKind::Create => {
                let mut cursor = entry.cursor.lock().await;
                *cursor = 0;
                *entry.state.lock() = WatchState::WatchedIdle;
                let _ = entry.sender.send(LogUpdate {
                    path: path.to_string_lossy().into_owned(),
                    entries: vec![],
                    update_type: UpdateType::Create,
                });
            }
            FileEventKind::Modify => {
                self.process_modify(&entry, path).await;
            }
        }
    }

    async fn process_modify(&self, entry: &Arc<WatchEntry>, path: &Path) {
        *entry.state.lock() = WatchState::WatchedReading;
        let mut cursor = entry.cursor.lock().await;

        let Ok(meta) = std::fs::metadata(path) else {
            drop(cursor);
            *entry.state.lock() = WatchState::WatchedIdle;
            return;
        };
        let size = meta.len();

        let mut update_type = UpdateType::Append;
        if size < *cursor {
            tracing::warn!(path = %path.display(), "truncation detected, resetting cursor");
            *cursor = 0;
            *entry.state.lock() = WatchState::Truncated;
            update_type = UpdateType::Truncate;
            self.parsers.invalidate(&path.to_string_lossy());
            self.cache.invalidate_path(&path.to_string_lossy());
        }

        if size == *cursor {
            *entry.state.lock() = WatchState::WatchedIdle;
            return;
        }

        let entries = match self.read_new_lines(path, &mut cursor) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), "tail read failed: {e}");
                *entry.state.lock() = WatchState::WatchedIdle;
                return;
            }
        };

        *entry.state.lock() = WatchState::WatchedIdle;
        drop(cursor);

        if !entries.is_empty() {
            if entry
                .sender
                .send(LogUpdate {
                    path: path.to_string_lossy().into_owned(),
                    entries,
                    update_type,
                })
                .is_err()
            {
                tracing::debug!(path = %path.display(), "no subscribers for update");
            }
        }
    }

    /// Read every complete line appended since `*cursor`, in cheap tail
    /// mode (`lineNum = -1`).
    fn read_new_lines(&self, path: &Path, cursor: &mut u64) -> Result<Vec<LogEntry>> {
        let path_str = path.to_string_lossy().into_owned();
        let parser = self.parsers.detect(&path_str, &Self::sample_lines(path, 10));

        let mut file = std::fs::File::open(path)?;
        file.seek(SeekFrom::Start(*cursor))?;
        let mut reader = std::io::BufReader::new(file);

        let mut entries = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            *cursor += n as u64;
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            entries.push(self.parsers.parse_with_fallback(parser.as_ref(), trimmed, -1));
        }
        Ok(entries)
    }

    pub fn watch_state(&self, path: &Path) -> Option<WatchState> {
        let normalized = Self::normalize(path).ok()?;
        self.watches.lock().get(&normalized).map(|e| *e.state.lock())
    }

    /// Configured log roots, exposed for `SubscriptionHub`'s relative-path
    /// resolution.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve a client-supplied path the same way subscriptions do,
    /// reused by the HTTP read/tail/search surface so a
    /// path returned by `GetLogFiles`/`GetDirectoryFiles` or a bare
    /// root-relative filename both work: an absolute path must exist
    /// as-is, a relative path is tried against each configured root in
    /// order and resolves to the first one that exists.
    pub fn resolve_path(&self, requested: &Path) -> Result<PathBuf> {
        if requested.is_absolute() {
            return if requested.exists() {
                Ok(requested.to_path_buf())
            } else {
                Err(SentryError::NotFound(requested.display().to_string()))
            };
        }

        for root in &self.roots {
            let candidate = root.join(requested);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(SentryError::NotFound(requested.display().to_string()))
    }

    pub fn pool_stats(&self) -> crate::pool::PoolStats {
        self.pool.stats()
    }
}

/// Count total lines by streaming once; used only on a page-cache miss.
fn count_lines(reader: &mut impl BufRead) -> Result<u64> {
    let mut count = 0u64;
    let mut buf = Vec::with_capacity(8192);
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
