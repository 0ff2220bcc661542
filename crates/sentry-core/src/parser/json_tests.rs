// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_standard_fields() {
    let line = r#"{"timestamp":"2024-01-01T10:00:00Z","level":"err","message":"boom","req_id":"abc"}"#;
    let entry = JsonParser.parse(line).unwrap();
    assert_eq!(entry.level, "ERROR");
    assert_eq!(entry.message, "boom");
    assert_eq!(entry.raw, line);
    assert!(entry.fields.contains_key("req_id"));
    assert!(!entry.fields.contains_key("level"));
}

#[test]
fn synthesizes_message_from_fallback_keys() {
    let line = r#"{"event":"startup","error":"disk full"}"#;
    let entry = JsonParser.parse(line).unwrap();
    assert_eq!(entry.message, "disk full | startup");
}

#[test]
fn synthesizes_generic_message_when_nothing_available() {
    let line = r#"{"req_id":"abc","status":200}"#;
    let entry = JsonParser.parse(line).unwrap();
    assert_eq!(entry.message, "JSON log entry with 2 fields");
}

#[test]
fn rejects_non_object_lines() {
    assert!(JsonParser.parse("not json").is_err());
    assert!(JsonParser.parse("[1,2,3]").is_err());
    assert!(JsonParser.parse("   ").is_err());
}

#[test]
fn unix_millis_and_seconds() {
    let secs = r#"{"ts":1700000000,"message":"a"}"#;
    let millis = r#"{"ts":1700000000000,"message":"a"}"#;
    assert_eq!(JsonParser.parse(secs).unwrap().timestamp, 1_700_000_000_000);
    assert_eq!(JsonParser.parse(millis).unwrap().timestamp, 1_700_000_000_000);
}
