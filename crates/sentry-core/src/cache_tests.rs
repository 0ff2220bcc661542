// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::{LogContent, SearchResult};

fn sample_page() -> LogContent {
    LogContent { entries: vec![], total_lines: 0, has_more: false, offset: 0 }
}

fn sample_search() -> SearchResult {
    SearchResult { entries: vec![], total_count: 0, has_more: false, offset: 0 }
}

#[test]
fn critical_pressure_clears_everything() {
    let monitor = MemoryMonitor::new(100);
    let cache = CacheLayer::new(monitor);
    cache.page.insert("a".to_owned(), sample_page());
    cache.search.insert("b".to_owned(), sample_search());
    assert_eq!(cache.stats().page_entries, 1);

    cache.monitor.sample(95); // >= 90% of cap -> critical
    assert_eq!(cache.stats().page_entries, 0);
    assert_eq!(cache.stats().search_entries, 0);
}

#[test]
fn warning_pressure_drops_oldest_half() {
    let monitor = MemoryMonitor::new(1000);
    let cache = CacheLayer::new(monitor);
    for i in 0..4 {
        cache.page.insert(format!("k{i}"), sample_page());
    }
    cache.monitor.sample(750); // 75% -> warning
    assert_eq!(cache.stats().page_entries, 2);
}

#[test]
fn no_caching_while_under_pressure() {
    let monitor = MemoryMonitor::new(100);
    let cache = CacheLayer::new(monitor);
    cache.monitor.sample(95);
    cache.put_page("k".to_owned(), sample_page());
    assert_eq!(cache.stats().page_entries, 0);
}

#[test]
fn transition_fires_once() {
    let monitor = MemoryMonitor::new(100);
    let count = Arc::new(AtomicU64::new(0));
    let c = Arc::clone(&count);
    monitor.on_transition(move |level| {
        if level == PressureLevel::Warning {
            c.fetch_add(1, Ordering::SeqCst);
        }
    });
    monitor.sample(75);
    monitor.sample(76);
    monitor.sample(77);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
