// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use super::*;
use crate::manager::{LogManager, LogManagerConfig};

fn engine_for(dir: &Path) -> SearchEngine {
    let manager = LogManager::new(LogManagerConfig {
        roots: vec![dir.to_path_buf()],
        max_file_size: 10 * 1024 * 1024,
        cache_memory_cap_bytes: 100 * 1024 * 1024,
    })
    .unwrap();
    SearchEngine::new(manager)
}

fn write_lines(path: &Path, lines: &[&str]) {
    let mut f = std::fs::File::create(path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
}

#[test]
fn plain_text_search_highlights_matches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    write_lines(&path, &["connection refused", "request completed", "connection reset"]);

    let engine = engine_for(dir.path());
    let query = SearchQuery {
        path: path.to_string_lossy().into_owned(),
        query: "connection".to_owned(),
        is_regex: false,
        start_time: 0,
        end_time: 0,
        levels: vec![],
        offset: 0,
        limit: 10,
    };
    let result = engine.search(&query).unwrap();
    assert_eq!(result.total_count, 2);
    assert!(result.entries[0].message.contains("<mark>connection</mark>"));
}

#[test]
fn invalid_regex_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    write_lines(&path, &["hello"]);

    let engine = engine_for(dir.path());
    let query = SearchQuery {
        path: path.to_string_lossy().into_owned(),
        query: "(".to_owned(),
        is_regex: true,
        start_time: 0,
        end_time: 0,
        levels: vec![],
        offset: 0,
        limit: 10,
    };
    assert!(engine.search(&query).is_err());
}

#[test]
fn level_filter_narrows_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    write_lines(
        &path,
        &[
            r#"{"level":"info","message":"starting up"}"#,
            r#"{"level":"error","message":"boom"}"#,
            r#"{"level":"info","message":"shutting down"}"#,
        ],
    );

    let engine = engine_for(dir.path());
    let query = SearchQuery {
        path: path.to_string_lossy().into_owned(),
        query: String::new(),
        is_regex: false,
        start_time: 0,
        end_time: 0,
        levels: vec!["ERROR".to_owned()],
        offset: 0,
        limit: 10,
    };
    let result = engine.search(&query).unwrap();
    assert_eq!(result.total_count, 1);
    assert_eq!(result.entries[0].message, "boom");
}

#[test]
fn highlight_covers_raw_as_well_as_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    write_lines(&path, &[r#"{"level":"info","message":"connection refused"}"#]);

    let engine = engine_for(dir.path());
    let query = SearchQuery {
        path: path.to_string_lossy().into_owned(),
        query: "refused".to_owned(),
        is_regex: false,
        start_time: 0,
        end_time: 0,
        levels: vec![],
        offset: 0,
        limit: 10,
    };
    let result = engine.search(&query).unwrap();
    assert_eq!(result.total_count, 1);
    assert!(result.entries[0].message.contains("<mark>refused</mark>"));
    assert!(result.entries[0].raw.contains("<mark>refused</mark>"));
}

#[test]
fn zero_matches_reports_no_more() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    write_lines(&path, &["nothing interesting here"]);

    let engine = engine_for(dir.path());
    let query = SearchQuery {
        path: path.to_string_lossy().into_owned(),
        query: "needle".to_owned(),
        is_regex: false,
        start_time: 0,
        end_time: 0,
        levels: vec![],
        offset: 0,
        limit: 10,
    };
    let result = engine.search(&query).unwrap();
    assert_eq!(result.total_count, 0);
    assert!(!result.has_more);
}

/// A match well past the old `(offset + limit) * TOTAL_COUNT_MULTIPLIER`
/// line-count window must still be found: the scan has to walk the whole
/// file, not just a fixed-size page of raw lines from the start.
#[test]
fn finds_matches_beyond_the_old_page_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let mut lines: Vec<String> = (0..500).map(|i| format!("filler line {i}")).collect();
    lines.push("needle found here".to_owned());
    let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_lines(&path, &borrowed);

    let engine = engine_for(dir.path());
    let query = SearchQuery {
        path: path.to_string_lossy().into_owned(),
        query: "needle".to_owned(),
        is_regex: false,
        start_time: 0,
        end_time: 0,
        levels: vec![],
        offset: 0,
        limit: 1,
    };
    let result = engine.search(&query).unwrap();
    assert_eq!(result.total_count, 1);
    assert_eq!(result.entries.len(), 1);
    assert!(!result.has_more);
}
