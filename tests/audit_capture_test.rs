// ABOUTME: Tests for audit event derivation from request metadata
// ABOUTME: Method-to-action mapping and path-to-resource extraction tables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![allow(missing_docs, clippy::unwrap_used)]

use embedchat_server::models::AuditAction;
use embedchat_server::security::audit::{extract_resource_id, extract_resource_type};

#[test]
fn method_maps_to_action() {
    assert_eq!(AuditAction::from_method("POST"), AuditAction::Create);
    assert_eq!(AuditAction::from_method("put"), AuditAction::Update);
    assert_eq!(AuditAction::from_method("PATCH"), AuditAction::Update);
    assert_eq!(AuditAction::from_method("DELETE"), AuditAction::Delete);
    assert_eq!(AuditAction::from_method("GET"), AuditAction::Read);
    assert_eq!(AuditAction::from_method("OPTIONS"), AuditAction::Read);
}

#[test]
fn resource_type_prefers_most_specific_pattern() {
    assert_eq!(
        extract_resource_type("/api/chats/abc/ui-settings"),
        "ui_settings"
    );
    assert_eq!(
        extract_resource_type("/api/chats/abc/suggestions"),
        "suggestions"
    );
    assert_eq!(extract_resource_type("/api/chats/abc"), "chat");
    assert_eq!(extract_resource_type("/api/chats"), "chat");
    assert_eq!(extract_resource_type("/api/knowledge/files"), "knowledge_file");
    assert_eq!(extract_resource_type("/api/knowledge/urls"), "knowledge_url");
    assert_eq!(extract_resource_type("/api/knowledge/texts"), "knowledge_text");
    assert_eq!(extract_resource_type("/api/knowledge/xyz"), "knowledge");
    assert_eq!(extract_resource_type("/api/auth/me"), "unknown");
}

#[test]
fn resource_id_skips_sub_resource_segments() {
    assert_eq!(extract_resource_id("/api/chats/abc").as_deref(), Some("abc"));
    assert_eq!(
        extract_resource_id("/api/chats/abc/ui-settings").as_deref(),
        Some("abc")
    );
    assert_eq!(
        extract_resource_id("/api/knowledge/k-123").as_deref(),
        Some("k-123")
    );
    assert_eq!(extract_resource_id("/api/knowledge/files"), None);
    assert_eq!(extract_resource_id("/api/knowledge/urls"), None);
    assert_eq!(extract_resource_id("/api/knowledge/texts"), None);
    assert_eq!(extract_resource_id("/api/chats"), None);
    assert_eq!(extract_resource_id("/health"), None);
}

#[test]
fn event_serialization_omits_absent_optionals() {
    let event = embedchat_server::models::AuditEvent::new(
        "user-1",
        "a@b.c",
        AuditAction::Delete,
        "chat",
        "DELETE",
        "/api/chats/x",
        200,
        5,
    );
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["action"], "delete");
    assert!(value.get("resource_id").is_none());
    assert!(value.get("client_ip").is_none());
    assert!(value.get("changes_summary").is_none());
    assert!(value["event_id"].is_string());
    assert!(value["event_timestamp"].is_string());
}
