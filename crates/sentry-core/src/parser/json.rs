// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON log line parser.

use std::collections::HashMap;

use serde_json::Value;

use super::{require_non_blank, LogParser};
use crate::error::{Result, SentryError};
use crate::model::{LogEntry, LogType};

/// Field names tried in priority order for each extracted attribute.
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "ts", "time", "@timestamp"];
const LEVEL_KEYS: &[&str] = &["level", "severity", "priority"];
const MESSAGE_KEYS: &[&str] = &["message", "msg", "text"];
const MESSAGE_FALLBACK_KEYS: &[&str] = &["error", "event", "action"];

pub struct JsonParser;

impl JsonParser {
    fn looks_like_object(trimmed: &str) -> bool {
        trimmed.starts_with('{') && trimmed.ends_with('}')
    }
}

impl LogParser for JsonParser {
    fn parse(&self, line: &str) -> Result<LogEntry> {
        require_non_blank(line)?;
        let trimmed = line.trim();
        if !Self::looks_like_object(trimmed) {
            return Err(SentryError::InvalidInput("not a JSON object".to_owned()));
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| SentryError::InvalidInput(format!("invalid JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(SentryError::InvalidInput("JSON line is not an object".to_owned()));
        };

        let timestamp = TIMESTAMP_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(parse_timestamp_value)
            .unwrap_or(0);

        let level = LEVEL_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(Value::as_str)
            .and_then(crate::model::LogLevel::parse_alias)
            .map(|l| l.as_str().to_owned())
            .unwrap_or_default();

        let message = MESSAGE_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| synthesize_message(&map));

        let mut consumed: Vec<&str> = Vec::new();
        consumed.extend(TIMESTAMP_KEYS.iter().filter(|k| map.contains_key(**k)).take(1));
        consumed.extend(LEVEL_KEYS.iter().filter(|k| map.contains_key(**k)).take(1));
        consumed.extend(MESSAGE_KEYS.iter().filter(|k| map.contains_key(**k)).take(1));

        let fields: HashMap<String, Value> = map
            .into_iter()
            .filter(|(k, _)| !consumed.contains(&k.as_str()))
            .collect();

        Ok(LogEntry {
            timestamp,
            level,
            message,
            fields,
            raw: line.to_owned(),
            line_num: 0,
            log_type: LogType::Json,
        })
    }

    fn can_parse(&self, sample: &str) -> bool {
        let trimmed = sample.trim();
        Self::looks_like_object(trimmed) && serde_json::from_str::<Value>(trimmed).is_ok()
    }

    fn format(&self) -> &'static str {
        "JSON"
    }
}

fn synthesize_message(map: &serde_json::Map<String, Value>) -> String {
    let parts: Vec<String> = MESSAGE_FALLBACK_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .filter_map(|v| v.as_str().map(str::to_owned).or_else(|| Some(v.to_string())))
        .collect();

    if parts.is_empty() {
        format!("JSON log entry with {} fields", map.len())
    } else {
        parts.join(" | ")
    }
}

/// Parse a timestamp value, trying in order: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS[.fff]`, Unix seconds (10 digits), Unix millis
/// (13 digits). Returns Unix millis.
fn parse_timestamp_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            let digits = n.as_i64().map(|i| i.abs().to_string()).unwrap_or_default();
            match digits.len() {
                10 => n.as_i64().map(|s| s * 1000),
                13 => n.as_i64(),
                _ => n.as_i64(),
            }
        }
        Value::String(s) => crate::parser::generic::parse_timestamp_str(s),
        _ => None,
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
