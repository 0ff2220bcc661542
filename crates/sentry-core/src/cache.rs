// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CacheLayer: page/search caches plus the MemoryMonitor that governs
//! eviction under memory pressure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::model::{LogContent, SearchResult};

const PAGE_TTL: Duration = Duration::from_secs(5 * 60);
const SEARCH_TTL: Duration = Duration::from_secs(10 * 60);
const SEARCH_CAPACITY: usize = 1000;
const SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

/// Memory pressure levels the monitor can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PressureLevel {
    Normal = 0,
    Warning = 1,
    Critical = 2,
}

impl PressureLevel {
    fn from_u8(v: u8) -> Self {
        match v {
            2 => Self::Critical,
            1 => Self::Warning,
            _ => Self::Normal,
        }
    }
}

type PressureCallback = Arc<dyn Fn(PressureLevel) + Send + Sync>;

/// Samples process RSS on an interval and fires callbacks exactly once per
/// threshold transition.
pub struct MemoryMonitor {
    cap_bytes: u64,
    level: AtomicU8,
    callbacks: RwLock<Vec<PressureCallback>>,
}

impl MemoryMonitor {
    pub fn new(cap_bytes: u64) -> Arc<Self> {
        Arc::new(Self { cap_bytes, level: AtomicU8::new(0), callbacks: RwLock::new(Vec::new()) })
    }

    pub fn on_transition(&self, callback: impl Fn(PressureLevel) + Send + Sync + 'static) {
        self.callbacks.write().push(Arc::new(callback));
    }

    pub fn is_memory_pressure(&self) -> bool {
        PressureLevel::from_u8(self.level.load(Ordering::Relaxed)) >= PressureLevel::Warning
    }

    pub fn level(&self) -> PressureLevel {
        PressureLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Advisory suggested cache sizes given current pressure.
    pub fn optimize_memory(&self) -> SuggestedSizes {
        match self.level() {
            PressureLevel::Normal => SuggestedSizes { search_capacity: SEARCH_CAPACITY },
            PressureLevel::Warning => SuggestedSizes { search_capacity: SEARCH_CAPACITY / 2 },
            PressureLevel::Critical => SuggestedSizes { search_capacity: 0 },
        }
    }

    /// Sample current resident memory and fire transition callbacks.
    /// Exposed separately from `spawn_sampler` so tests can drive it
    /// synchronously with an injected byte count.
    pub fn sample(&self, resident_bytes: u64) {
        let ratio = resident_bytes as f64 / self.cap_bytes.max(1) as f64;
        let new_level = if ratio >= 0.9 {
            PressureLevel::Critical
        } else if ratio >= 0.7 {
            PressureLevel::Warning
        } else {
            PressureLevel::Normal
        };

        let prev = PressureLevel::from_u8(self.level.swap(new_level as u8, Ordering::Relaxed));
        if prev != new_level {
            tracing::info!(?prev, ?new_level, resident_bytes, "memory pressure transition");
            for cb in self.callbacks.read().iter() {
                cb(new_level);
            }
        }
    }

    /// Spawn the periodic sampler. Stops when `shutdown` is cancelled.
    pub fn spawn_sampler(self: &Arc<Self>, shutdown: CancellationToken) {
        let monitor = Arc::clone(self);
        crate::task::supervise("memory-monitor", shutdown.clone(), move || {
            let monitor = Arc::clone(&monitor);
            let shutdown = shutdown.clone();
            async move {
                let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = interval.tick() => {
                            monitor.sample(current_rss_bytes());
                        }
                    }
                }
            }
        });
    }
}

pub struct SuggestedSizes {
    pub search_capacity: usize,
}

/// Best-effort resident-set-size read from `/proc/self/statm` on Linux;
/// falls back to 0 (treated as "no pressure") elsewhere.
fn current_rss_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(pages) = contents.split_whitespace().nth(1) {
                if let Ok(pages) = pages.parse::<u64>() {
                    return pages * 4096;
                }
            }
        }
    }
    0
}

struct Entry<T> {
    value: T,
    inserted_at: Instant,
    last_access: Instant,
}

/// A TTL + approximate-LRU map. Not generic over eviction strategy beyond
/// "drop the oldest-accessed half", the only eviction mode this layer
/// needs.
struct TtlCache<K, V> {
    ttl: Duration,
    capacity: Option<usize>,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    fn new(ttl: Duration, capacity: Option<usize>) -> Self {
        Self { ttl, capacity, entries: RwLock::new(HashMap::new()) }
    }

    fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.write();
        let expired = match entries.get(key) {
            Some(e) => e.inserted_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        let entry = entries.get_mut(key)?;
        entry.last_access = Instant::now();
        Some(entry.value.clone())
    }

    fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write();
        let now = Instant::now();
        entries.insert(key, Entry { value, inserted_at: now, last_access: now });

        if let Some(cap) = self.capacity {
            if entries.len() > cap {
                evict_oldest_half(&mut entries);
            }
        }
    }

    fn remove(&self, key: &K) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Drop the lowest-priority (oldest-accessed) half of entries.
    fn evict_half(&self) {
        let mut entries = self.entries.write();
        evict_oldest_half(&mut entries);
    }
}

fn evict_oldest_half<K: std::hash::Hash + Eq + Clone, V>(entries: &mut HashMap<K, Entry<V>>) {
    let mut by_access: Vec<(K, Instant)> =
        entries.iter().map(|(k, e)| (k.clone(), e.last_access)).collect();
    by_access.sort_by_key(|(_, last_access)| *last_access);
    let drop_count = by_access.len() / 2;
    for (key, _) in by_access.into_iter().take(drop_count) {
        entries.remove(&key);
    }
}

/// Unified page/search cache with memory-pressure-aware eviction.
pub struct CacheLayer {
    page: TtlCache<String, LogContent>,
    search: TtlCache<String, SearchResult>,
    pub monitor: Arc<MemoryMonitor>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheLayer {
    pub fn new(monitor: Arc<MemoryMonitor>) -> Arc<Self> {
        let layer = Arc::new(Self {
            page: TtlCache::new(PAGE_TTL, None),
            search: TtlCache::new(SEARCH_TTL, Some(SEARCH_CAPACITY)),
            monitor,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        });

        let for_callback = Arc::clone(&layer);
        layer.monitor.on_transition(move |level| match level {
            PressureLevel::Warning => {
                for_callback.page.evict_half();
                for_callback.search.evict_half();
            }
            PressureLevel::Critical => {
                for_callback.clear();
            }
            PressureLevel::Normal => {}
        });

        layer
    }

    /// Page-cache key: `(path, offset, limit, modTime)`.
    pub fn page_key(path: &str, offset: u64, limit: u64, mod_time: i64) -> String {
        format!("{path}\u{1}{offset}\u{1}{limit}\u{1}{mod_time}")
    }

    pub fn get_page(&self, key: &str) -> Option<LogContent> {
        let hit = self.page.get(&key.to_owned());
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn put_page(&self, key: String, value: LogContent) {
        if self.monitor.is_memory_pressure() {
            return;
        }
        self.page.insert(key, value);
    }

    pub fn get_search(&self, key: &str) -> Option<SearchResult> {
        let hit = self.search.get(&key.to_owned());
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn put_search(&self, key: String, value: SearchResult) {
        if self.monitor.is_memory_pressure() {
            return;
        }
        self.search.insert(key, value);
    }

    pub fn invalidate_path(&self, path: &str) {
        self.page.entries.write().retain(|k, _| !k.starts_with(path));
        self.search.entries.write().retain(|k, _| !k.starts_with(path));
    }

    /// Clear every cache this layer owns, on critical memory pressure.
    pub fn clear(&self) {
        self.page.clear();
        self.search.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            page_entries: self.page.len(),
            search_entries: self.search.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub page_entries: usize,
    pub search_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
