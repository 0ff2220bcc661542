// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic fallback parser: always succeeds.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use super::{require_non_blank, LogParser};
use crate::error::Result;
use crate::model::{LogEntry, LogType};

/// Ordered so `WARNING` is tried before `WARN` — otherwise `WARN` would
/// match inside `WARNING` and misclassify every warning line.
const LEVEL_KEYWORDS: &[(&str, &str)] = &[
    ("ERROR", "ERROR"),
    ("WARNING", "WARNING"),
    ("WARN", "WARN"),
    ("FATAL", "FATAL"),
    ("INFO", "INFO"),
    ("DEBUG", "DEBUG"),
    ("TRACE", "TRACE"),
];

pub struct GenericParser {
    timestamp_re: Regex,
    ip_re: Regex,
    status_re: Regex,
    trailing_size_re: Regex,
}

impl GenericParser {
    // Patterns are fixed string literals; a failure here is a compile-time
    // typo, not a runtime condition, so there is nothing to propagate.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            timestamp_re: Regex::new(
                r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?",
            )
            .expect("static regex"),
            ip_re: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("static regex"),
            status_re: Regex::new(r"\b([1-5]\d{2})\b").expect("static regex"),
            trailing_size_re: Regex::new(r"(\d+)\s*$").expect("static regex"),
        }
    }
}

impl Default for GenericParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser for GenericParser {
    fn parse(&self, line: &str) -> Result<LogEntry> {
        require_non_blank(line)?;

        let timestamp =
            self.timestamp_re.find(line).and_then(|m| parse_timestamp_str(m.as_str())).unwrap_or(0);

        let level = LEVEL_KEYWORDS
            .iter()
            .find(|(needle, _)| line.contains(needle))
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or_default();

        let mut fields = HashMap::new();
        if let Some(m) = self.ip_re.find(line) {
            fields.insert("ip".to_owned(), Value::String(m.as_str().to_owned()));
        }
        if let Some(caps) = self.status_re.captures(line) {
            if let Ok(code) = caps[1].parse::<u32>() {
                fields.insert("status".to_owned(), Value::Number(code.into()));
            }
        }
        if let Some(caps) = self.trailing_size_re.captures(line.trim_end()) {
            if let Ok(size) = caps[1].parse::<u64>() {
                fields.insert("size".to_owned(), Value::Number(size.into()));
            }
        }

        Ok(LogEntry {
            timestamp,
            level,
            message: line.to_owned(),
            fields,
            raw: line.to_owned(),
            line_num: 0,
            log_type: LogType::Generic,
        })
    }

    fn can_parse(&self, _sample: &str) -> bool {
        true
    }

    fn format(&self) -> &'static str {
        "Generic"
    }
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM:SS[.fff]`, returning Unix millis.
pub(crate) fn parse_timestamp_str(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    // Normalize the `T` separator variant and the space variant to one
    // format string.
    let normalized = s.replacen('T', " ", 1);
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    None
}

#[cfg(test)]
#[path = "generic_tests.rs"]
mod tests;
