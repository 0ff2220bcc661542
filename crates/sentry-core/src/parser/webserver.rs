// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Web-server access/error log parser: Apache Common/Combined, Nginx
//! access/error.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use super::{require_non_blank, LogParser};
use crate::error::Result;
use crate::model::{LogEntry, LogType};

use super::generic::parse_timestamp_str;

pub struct WebServerParser {
    apache_combined: Regex,
    apache_common: Regex,
    nginx_access: Regex,
    nginx_error: Regex,
}

impl WebServerParser {
    // Patterns are fixed string literals; a failure here is a compile-time
    // typo, not a runtime condition, so there is nothing to propagate.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let common = concat!(
            r#"^(?P<ip>\S+) \S+ \S+ \[(?P<time>[^\]]+)\] "#,
            r#""(?P<request>[^"]*)" (?P<status>\d{3}) (?P<bytes>\S+)"#,
        );
        let combined = concat!(
            r#"^(?P<ip>\S+) \S+ \S+ \[(?P<time>[^\]]+)\] "#,
            r#""(?P<request>[^"]*)" (?P<status>\d{3}) (?P<bytes>\S+) "(?P<referrer>[^"]*)" "(?P<agent>[^"]*)""#,
        );
        let nginx_access = concat!(
            r#"^(?P<ip>\S+) - \S+ \[(?P<time>[^\]]+)\] "#,
            r#""(?P<request>[^"]*)" (?P<status>\d{3}) (?P<bytes>\S+) "(?P<referrer>[^"]*)" "(?P<agent>[^"]*)""#,
        );
        // `2024/01/01 10:00:00 [error] 1234#0: *1 message`
        let nginx_error = r"^(?P<time>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(?P<level>\w+)\] (?P<pid>\d+)#\d+: (?P<message>.*)$";

        Self {
            apache_combined: Regex::new(combined).expect("static regex"),
            apache_common: Regex::new(common).expect("static regex"),
            nginx_access: Regex::new(nginx_access).expect("static regex"),
            nginx_error: Regex::new(nginx_error).expect("static regex"),
        }
    }

    fn level_for_status(status: u32) -> &'static str {
        if status >= 500 {
            "ERROR"
        } else if status >= 400 {
            "WARN"
        } else {
            "INFO"
        }
    }

    fn level_for_nginx_severity(word: &str) -> &'static str {
        match word.to_ascii_lowercase().as_str() {
            "emerg" | "alert" | "crit" | "error" => "ERROR",
            "warn" => "WARN",
            "notice" | "info" => "INFO",
            "debug" => "DEBUG",
            _ => "INFO",
        }
    }

    fn parse_access(&self, line: &str, re: &Regex) -> Option<LogEntry> {
        let caps = re.captures(line)?;
        let status: u32 = caps.name("status")?.as_str().parse().ok()?;
        let timestamp = parse_apache_time(caps.name("time")?.as_str()).unwrap_or(0);

        let mut fields = HashMap::new();
        fields.insert("remoteAddr".to_owned(), Value::String(caps.name("ip")?.as_str().to_owned()));
        fields.insert("request".to_owned(), Value::String(caps.name("request")?.as_str().to_owned()));
        fields.insert("status".to_owned(), Value::Number(status.into()));
        let bytes = caps.name("bytes")?.as_str();
        if let Ok(b) = bytes.parse::<u64>() {
            fields.insert("bodyBytes".to_owned(), Value::Number(b.into()));
        }
        if let Some(referrer) = caps.name("referrer") {
            fields.insert("referrer".to_owned(), Value::String(referrer.as_str().to_owned()));
        }
        if let Some(agent) = caps.name("agent") {
            fields.insert("userAgent".to_owned(), Value::String(agent.as_str().to_owned()));
        }

        Some(LogEntry {
            timestamp,
            level: Self::level_for_status(status).to_owned(),
            message: caps.name("request")?.as_str().to_owned(),
            fields,
            raw: line.to_owned(),
            line_num: 0,
            log_type: LogType::WebServer,
        })
    }

    fn parse_nginx_error(&self, line: &str) -> Option<LogEntry> {
        let caps = self.nginx_error.captures(line)?;
        let timestamp = parse_timestamp_str(&caps["time"].replace('/', "-")).unwrap_or(0);
        let mut fields = HashMap::new();
        fields.insert("pid".to_owned(), Value::String(caps["pid"].to_owned()));

        Some(LogEntry {
            timestamp,
            level: Self::level_for_nginx_severity(&caps["level"]).to_owned(),
            message: caps["message"].to_owned(),
            fields,
            raw: line.to_owned(),
            line_num: 0,
            log_type: LogType::WebServer,
        })
    }
}

impl Default for WebServerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser for WebServerParser {
    fn parse(&self, line: &str) -> Result<LogEntry> {
        require_non_blank(line)?;

        self.parse_access(line, &self.apache_combined)
            .or_else(|| self.parse_access(line, &self.nginx_access))
            .or_else(|| self.parse_access(line, &self.apache_common))
            .or_else(|| self.parse_nginx_error(line))
            .ok_or_else(|| {
                crate::error::SentryError::InvalidInput("not a recognized web-server log line".to_owned())
            })
    }

    fn can_parse(&self, sample: &str) -> bool {
        self.apache_combined.is_match(sample)
            || self.apache_common.is_match(sample)
            || self.nginx_access.is_match(sample)
            || self.nginx_error.is_match(sample)
    }

    fn format(&self) -> &'static str {
        "WebServer"
    }
}

/// Parse Apache/Nginx's `[10/Oct/2023:13:55:36 -0700]` bracket timestamp.
fn parse_apache_time(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_str(s, "%d/%b/%Y:%H:%M:%S %z").ok().map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
#[path = "webserver_tests.rs"]
mod tests;
