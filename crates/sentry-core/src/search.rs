// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SearchEngine: filtered, highlighted search over a single file.

use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::cache::CacheLayer;
use crate::error::Result;
use crate::manager::LogManager;
use crate::model::{LogEntry, SearchQuery, SearchResult};

/// Hard ceiling on `limit`, tightened under memory pressure.
const MAX_LIMIT: u64 = 1000;

/// `totalCount` is capped at `limit * TOTAL_COUNT_MULTIPLIER` matches rather
/// than scanning the whole file to an exact count; `hasMore` is reported
/// `true` once the cap is hit, trading an exact count for bounded latency on
/// large files.
const TOTAL_COUNT_MULTIPLIER: u64 = 10;

pub struct SearchEngine {
    manager: Arc<LogManager>,
    cache: Arc<CacheLayer>,
}

impl SearchEngine {
    pub fn new(manager: Arc<LogManager>) -> Self {
        let cache = Arc::clone(&manager.cache);
        Self { manager, cache }
    }

    /// Run `query` against its target path, returning a page of highlighted
    /// matches.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        query.validate()?;

        let clamped_limit = self.clamp_limit(query.limit);
        let mut effective = query.clone();
        effective.limit = clamped_limit;

        let cache_key = effective.cache_key();
        if let Some(cached) = self.cache.get_search(&cache_key) {
            return Ok(cached);
        }

        let path = Path::new(&effective.path);
        let predicate = Predicate::compile(&effective)?;

        let mut matched: Vec<LogEntry> = Vec::new();
        let mut total_count: u64 = 0;
        let mut truncated_count = false;
        let match_cap = effective.limit * TOTAL_COUNT_MULTIPLIER;

        self.manager.scan_entries(path, |entry| {
            if !predicate.matches(&entry) {
                return true;
            }
            if total_count >= effective.offset && matched.len() < effective.limit as usize {
                matched.push(predicate.highlight(entry));
            }
            total_count += 1;
            if total_count >= match_cap {
                truncated_count = true;
                return false;
            }
            true
        })?;

        let has_more = truncated_count || (effective.offset + matched.len() as u64) < total_count;
        let result =
            SearchResult { entries: matched, total_count, has_more, offset: effective.offset };

        if !self.cache.monitor.is_memory_pressure() {
            self.cache.put_search(cache_key, result.clone());
        }
        Ok(result)
    }

    fn clamp_limit(&self, requested: u64) -> u64 {
        let ceiling = match self.cache.monitor.optimize_memory().search_capacity {
            0 => 1,
            n if (n as u64) < MAX_LIMIT => n as u64,
            _ => MAX_LIMIT,
        };
        requested.min(MAX_LIMIT).min(ceiling.max(1))
    }
}

enum TextMatcher {
    None,
    Plain(String),
    Regex(Regex),
}

struct Predicate {
    text: TextMatcher,
    start_time: i64,
    end_time: i64,
    levels: Vec<String>,
}

impl Predicate {
    fn compile(query: &SearchQuery) -> Result<Self> {
        let text = if query.query.is_empty() {
            TextMatcher::None
        } else if query.is_regex {
            TextMatcher::Regex(Regex::new(&query.query)?)
        } else {
            TextMatcher::Plain(query.query.to_ascii_lowercase())
        };

        Ok(Self {
            text,
            start_time: query.start_time,
            end_time: query.end_time,
            levels: query.levels.iter().map(|l| l.to_ascii_uppercase()).collect(),
        })
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        if self.start_time > 0 && entry.timestamp < self.start_time {
            return false;
        }
        if self.end_time > 0 && entry.timestamp > self.end_time {
            return false;
        }
        if !self.levels.is_empty() && !self.levels.iter().any(|l| l == &entry.level) {
            return false;
        }
        match &self.text {
            TextMatcher::None => true,
            TextMatcher::Plain(needle) => entry.message.to_ascii_lowercase().contains(needle.as_str())
                || entry.raw.to_ascii_lowercase().contains(needle.as_str()),
            TextMatcher::Regex(re) => re.is_match(&entry.message) || re.is_match(&entry.raw),
        }
    }

    /// Wrap every match in `<mark>...</mark>`, in both `message` and `raw`,
    /// scanning right to left so earlier byte offsets stay valid as later
    /// ones are rewritten.
    fn highlight(&self, mut entry: LogEntry) -> LogEntry {
        entry.message = self.highlight_field(&entry.message);
        entry.raw = self.highlight_field(&entry.raw);
        entry
    }

    fn highlight_field(&self, field: &str) -> String {
        let ranges: Vec<(usize, usize)> = match &self.text {
            TextMatcher::None => Vec::new(),
            TextMatcher::Plain(needle) if !needle.is_empty() => {
                find_all_case_insensitive(field, needle)
            }
            TextMatcher::Plain(_) => Vec::new(),
            TextMatcher::Regex(re) => re.find_iter(field).map(|m| (m.start(), m.end())).collect(),
        };

        if ranges.is_empty() {
            return field.to_owned();
        }

        let mut highlighted = field.to_owned();
        for (start, end) in ranges.into_iter().rev() {
            highlighted.replace_range(end..end, "</mark>");
            highlighted.replace_range(start..start, "<mark>");
        }
        highlighted
    }
}

fn find_all_case_insensitive(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    let lower_haystack = haystack.to_ascii_lowercase();
    let mut ranges = Vec::new();
    let mut start = 0;
    while let Some(pos) = lower_haystack[start..].find(needle) {
        let match_start = start + pos;
        let match_end = match_start + needle.len();
        ranges.push((match_start, match_end));
        start = match_end;
    }
    ranges
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
