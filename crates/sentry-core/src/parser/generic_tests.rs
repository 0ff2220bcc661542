// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn extracts_timestamp_and_level() {
    let parser = GenericParser::new();
    let entry = parser.parse("2024-01-01T10:00:01Z ERROR Boom").unwrap();
    assert_eq!(entry.level, "ERROR");
    assert!(entry.timestamp > 0);
}

#[test]
fn warning_not_misparsed_as_warn() {
    let parser = GenericParser::new();
    let entry = parser.parse("2024-01-01 10:00:00 WARNING disk nearly full").unwrap();
    assert_eq!(entry.level, "WARNING");
}

#[test]
fn always_succeeds_without_timestamp() {
    let parser = GenericParser::new();
    let entry = parser.parse("just plain text").unwrap();
    assert_eq!(entry.timestamp, 0);
    assert_eq!(entry.level, "");
}

#[test]
fn rejects_blank_lines() {
    assert!(GenericParser::new().parse("   ").is_err());
}

#[test]
fn extracts_convenience_fields() {
    let parser = GenericParser::new();
    let entry = parser.parse("192.168.1.1 - GET /x 200 512").unwrap();
    assert_eq!(entry.fields.get("ip").unwrap().as_str().unwrap(), "192.168.1.1");
    assert_eq!(entry.fields.get("size").unwrap().as_u64().unwrap(), 512);
}
