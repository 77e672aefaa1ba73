// ABOUTME: Unit tests for domain and target normalization
// ABOUTME: Idempotence, canonical forms, dedup, and alias sanitization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![allow(missing_docs, clippy::unwrap_used)]

use embedchat_server::domain::{
    normalize_domain, normalize_target, normalize_targets, sanitize_chat_id,
};
use embedchat_server::models::TargetKind;

#[test]
fn normalize_strips_scheme_port_path_and_www() {
    assert_eq!(normalize_domain("HTTPS://WWW.Example.com:443/"), "example.com");
    assert_eq!(normalize_domain("http://example.com"), "example.com");
    assert_eq!(normalize_domain("example.com:8080"), "example.com");
    assert_eq!(normalize_domain("example.com/"), "example.com");
    assert_eq!(normalize_domain("www.example.com"), "example.com");
    assert_eq!(normalize_domain("  Example.COM  "), "example.com");
    assert_eq!(
        normalize_domain("https://www.shop.example.co.jp:8443/cart/checkout"),
        "shop.example.co.jp"
    );
}

#[test]
fn normalize_keeps_canonical_input_untouched() {
    assert_eq!(normalize_domain("example.com"), "example.com");
    assert_eq!(normalize_domain("sub.example.com"), "sub.example.com");
}

#[test]
fn normalize_handles_degenerate_input() {
    assert_eq!(normalize_domain(""), "");
    assert_eq!(normalize_domain("   "), "");
    assert_eq!(normalize_domain("https://"), "");
    assert_eq!(normalize_domain(".example.com"), "example.com");
    // www itself is a prefix, not a domain component to keep
    assert_eq!(normalize_domain("www."), "");
}

#[test]
fn normalize_is_idempotent() {
    let inputs = [
        "HTTPS://WWW.Example.com:443/",
        "http://foo.bar/baz/qux",
        "www.a.b.c:9000",
        "plain.domain",
        "  spaced.example.com  ",
        "",
        "https://",
        ".leading.dot",
        "localhost:5173",
    ];
    for input in inputs {
        let once = normalize_domain(input);
        assert_eq!(normalize_domain(&once), once, "not idempotent for {input:?}");
    }
}

#[test]
fn web_targets_normalize_but_opaque_targets_only_trim() {
    assert_eq!(
        normalize_target("HTTPS://WWW.Example.com/", TargetKind::Web),
        "example.com"
    );
    assert_eq!(
        normalize_target("  LINE-channel-42  ", TargetKind::Line),
        "LINE-channel-42"
    );
    assert_eq!(
        normalize_target("Custom/Handle", TargetKind::Custom),
        "Custom/Handle"
    );
}

#[test]
fn normalize_targets_dedups_preserving_first_seen_order() {
    let list = vec![
        "a.com".to_owned(),
        "A.COM".to_owned(),
        "https://a.com/".to_owned(),
    ];
    assert_eq!(
        normalize_targets(Some(&list), Some(""), TargetKind::Web),
        vec!["a.com"]
    );

    let list = vec!["b.com".to_owned(), "a.com".to_owned(), "b.com".to_owned()];
    assert_eq!(
        normalize_targets(Some(&list), None, TargetKind::Web),
        vec!["b.com", "a.com"]
    );
}

#[test]
fn normalize_targets_merges_fallback_and_drops_empties() {
    let list = vec![String::new(), "  ".to_owned()];
    assert_eq!(
        normalize_targets(Some(&list), Some("www.site.org"), TargetKind::Web),
        vec!["site.org"]
    );
    assert!(normalize_targets(None, None, TargetKind::Web).is_empty());
    assert!(normalize_targets(Some(&[]), Some(""), TargetKind::Web).is_empty());
}

#[test]
fn sanitize_chat_id_collapses_separators() {
    assert_eq!(sanitize_chat_id("My Chat"), "my-chat");
    assert_eq!(sanitize_chat_id("  Spaced   Out  "), "spaced-out");
    assert_eq!(sanitize_chat_id("a/b\\c"), "a-b-c");
    assert_eq!(sanitize_chat_id("already-clean"), "already-clean");
    assert_eq!(sanitize_chat_id(""), "");
}

#[test]
fn target_kind_parsing_defaults_and_collapses() {
    assert_eq!(TargetKind::from_raw(""), TargetKind::Web);
    assert_eq!(TargetKind::from_raw("WEB"), TargetKind::Web);
    assert_eq!(TargetKind::from_raw("line"), TargetKind::Line);
    assert_eq!(TargetKind::from_raw("telegram"), TargetKind::Custom);
}
