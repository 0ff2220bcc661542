// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn exact_ip_matches() {
    assert!(matches_rule("127.0.0.1".parse().unwrap(), "127.0.0.1"));
    assert!(!matches_rule("127.0.0.2".parse().unwrap(), "127.0.0.1"));
}

#[test]
fn cidr_v4_matches_subnet() {
    assert!(matches_rule("10.0.0.42".parse().unwrap(), "10.0.0.0/24"));
    assert!(!matches_rule("10.0.1.42".parse().unwrap(), "10.0.0.0/24"));
}

#[test]
fn empty_allowlist_is_handled_by_caller_not_here() {
    // matches_rule always evaluates a single rule; the empty-list
    // short-circuit lives in `allowed_ips_layer`.
    assert!(!matches_rule("1.2.3.4".parse().unwrap(), "5.6.7.8"));
}
