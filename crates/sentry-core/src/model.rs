// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-shaped data model shared across the engine and its transports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A directory-listing entry. `children` is only populated for directory
/// nodes and is `None` (never `Some(vec![])`) for leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFile {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub mod_time: i64,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LogFile>>,
}

/// Recognized log levels. Comparisons against a `SearchQuery` level filter
/// are case-insensitive on the wire, but entries are normalized to this set
/// once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Parse a level keyword, normalizing case and known aliases
    /// (`err` -> ERROR, `warning` -> WARN, per the JSON parser's contract).
    pub fn parse_alias(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" => Some(Self::Warn),
            "WARNING" => Some(Self::Warning),
            "ERROR" | "ERR" => Some(Self::Error),
            "FATAL" | "CRITICAL" | "CRIT" => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// The source format a [`LogEntry`] was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    Json,
    WebServer,
    Generic,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::WebServer => "WebServer",
            Self::Generic => "Generic",
        }
    }
}

/// One parsed line. `timestamp` is Unix millis, 0 when unparseable.
/// `line_num` is 1-based, or -1 for cheap real-time tail records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
    pub raw: String,
    pub line_num: i64,
    pub log_type: LogType,
}

impl LogEntry {
    /// A bare fallback entry for lines no parser could interpret beyond
    /// verbatim storage.
    pub fn fallback(raw: &str, line_num: i64) -> Self {
        Self {
            timestamp: 0,
            level: String::new(),
            message: raw.to_owned(),
            fields: HashMap::new(),
            raw: raw.to_owned(),
            line_num,
            log_type: LogType::Generic,
        }
    }
}

/// A page returned by a read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContent {
    pub entries: Vec<LogEntry>,
    pub total_lines: u64,
    pub has_more: bool,
    pub offset: u64,
}

/// A search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub is_regex: bool,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub levels: Vec<String>,
    #[serde(default)]
    pub offset: u64,
    pub limit: u64,
}

impl SearchQuery {
    /// Validate query invariants: `limit >= 1`, `offset >= 0` (always true
    /// for `u64`), and that a regex query compiles.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.limit < 1 {
            return Err(crate::error::SentryError::InvalidInput(
                "limit must be >= 1".to_owned(),
            ));
        }
        if self.is_regex {
            regex::Regex::new(&self.query)?;
        }
        Ok(())
    }

    /// Stable cache key for the search cache.
    pub fn cache_key(&self) -> String {
        format!(
            "{}\u{1}{}\u{1}{}\u{1}{}\u{1}{}\u{1}{}\u{1}{}\u{1}{}",
            self.path,
            self.query,
            self.is_regex,
            self.start_time,
            self.end_time,
            self.levels.join(","),
            self.offset,
            self.limit
        )
    }
}

/// A page of search matches, highlighted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub entries: Vec<LogEntry>,
    pub total_count: u64,
    pub has_more: bool,
    pub offset: u64,
}

/// The kind of change a [`LogUpdate`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Append,
    Truncate,
    Delete,
    Create,
}

/// Push-side payload delivered to subscribers on file change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogUpdate {
    pub path: String,
    pub entries: Vec<LogEntry>,
    #[serde(rename = "type")]
    pub update_type: UpdateType,
}

/// Client -> server control frames on `/ws`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { path: String },
    Unsubscribe { path: String },
    Ping,
}

/// Server -> client frames on `/ws`. Each struct-style variant's sole
/// field is named `data` so the internally-tagged encoding produces the
/// wire shape `{"type":"...","data":{...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed { data: SubscribedData },
    Unsubscribed { data: SubscribedData },
    LogUpdate { data: LogUpdate },
    Pong { data: PongData },
    Error { data: ErrorData },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedData {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PongData {
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub code: String,
    pub message: String,
}
