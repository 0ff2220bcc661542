// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ParserRegistry: format auto-detection and line-to-record parsing.

mod generic;
mod json;
mod webserver;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, SentryError};
use crate::model::LogEntry;

pub use generic::GenericParser;
pub use json::JsonParser;
pub use webserver::WebServerParser;

/// The capability set every concrete parser implements.
pub trait LogParser: Send + Sync {
    /// Parse one line into a structured entry. `entry.raw` is set to `line`
    /// verbatim; `line_num` is left at 0 for the caller to assign.
    fn parse(&self, line: &str) -> Result<LogEntry>;

    /// Cheap heuristic: does this line look like something this parser
    /// handles? Used only for format auto-detection, never to reject a
    /// `parse` call outright.
    fn can_parse(&self, sample: &str) -> bool;

    fn format(&self) -> &'static str;
}

/// How many non-empty sample lines auto-detection scores each parser
/// against.
const SAMPLE_SIZE: usize = 10;

/// Registry of parsers plus the per-path format cache.
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn LogParser>>,
    format_cache: RwLock<HashMap<String, usize>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Arc::new(JsonParser),
                Arc::new(WebServerParser::new()),
                Arc::new(GenericParser::new()),
            ],
            format_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Index of the always-available Generic fallback.
    fn generic_index(&self) -> usize {
        self.parsers.len() - 1
    }

    /// Score each parser against `sample_lines` (first 10 non-empty lines
    /// of a file) and cache the winner for `path`. Tie-break: JSON wins if
    /// it matches > 50% of samples; otherwise WebServer beats Generic.
    pub fn detect(&self, path: &str, sample_lines: &[String]) -> Arc<dyn LogParser> {
        if let Some(&idx) = self.format_cache.read().get(path) {
            return Arc::clone(&self.parsers[idx]);
        }

        let sample: Vec<&str> = sample_lines.iter().map(|s| s.as_str()).take(SAMPLE_SIZE).collect();
        let total = sample.len().max(1);

        let json_idx = 0;
        let webserver_idx = 1;
        let generic_idx = self.generic_index();

        let json_hits = sample.iter().filter(|l| self.parsers[json_idx].can_parse(l)).count();
        let webserver_hits =
            sample.iter().filter(|l| self.parsers[webserver_idx].can_parse(l)).count();

        let chosen = if json_hits * 2 > total {
            json_idx
        } else if webserver_hits > 0 {
            webserver_idx
        } else {
            generic_idx
        };

        self.format_cache.write().insert(path.to_owned(), chosen);
        Arc::clone(&self.parsers[chosen])
    }

    /// Invalidate the cached format choice for `path` (on truncate/delete).
    pub fn invalidate(&self, path: &str) {
        self.format_cache.write().remove(path);
    }

    /// Drop every cached format choice. The format cache is logically one
    /// of the caches that clear together on critical memory pressure; it
    /// lives here rather than inside `CacheLayer` because format selection
    /// is `ParserRegistry`'s own state, but `LogManager` still wires it
    /// into the same clear-on-critical contract.
    pub fn clear(&self) {
        self.format_cache.write().clear();
    }

    /// Parse `line`, assigning `line_num`. Never fails the surrounding
    /// read: an error from the chosen parser falls back to a bare entry
    /// with `raw` set.
    pub fn parse_with_fallback(
        &self,
        parser: &dyn LogParser,
        line: &str,
        line_num: i64,
    ) -> LogEntry {
        match parser.parse(line) {
            Ok(mut entry) => {
                entry.line_num = line_num;
                entry
            }
            Err(_) => LogEntry::fallback(line, line_num),
        }
    }

    pub fn generic(&self) -> Arc<dyn LogParser> {
        Arc::clone(&self.parsers[self.generic_index()])
    }
}

/// A line with only whitespace, or none, can never be parsed.
fn reject_blank(line: &str) -> Result<()> {
    if line.trim().is_empty() {
        return Err(SentryError::InvalidInput("cannot parse an empty line".to_owned()));
    }
    Ok(())
}

pub(crate) use reject_blank as require_non_blank;

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
