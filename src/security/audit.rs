// ABOUTME: Audit event construction for mutating management requests
// ABOUTME: Derives action, resource type, and resource id from request metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! # Audit capture
//!
//! Every authenticated mutating request produces an immutable audit event
//! at the end of its lifecycle. The action comes from the HTTP method, the
//! resource type and id from a fixed path-pattern table. Recording is
//! fire-and-forget: the event is handed to the warehouse logger on a
//! detached task so the HTTP response never waits on analytics.

use crate::external::bigquery::BigQueryLogger;
use crate::models::AuditEvent;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Map a request path to a resource category
#[must_use]
pub fn extract_resource_type(path: &str) -> &'static str {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            (r"^/api/chats/[^/]+/ui-settings", "ui_settings"),
            (r"^/api/chats/[^/]+/suggestions", "suggestions"),
            (r"^/api/chats", "chat"),
            (r"^/api/knowledge/files", "knowledge_file"),
            (r"^/api/knowledge/urls", "knowledge_url"),
            (r"^/api/knowledge/texts", "knowledge_text"),
            (r"^/api/knowledge", "knowledge"),
        ]
        .into_iter()
        .filter_map(|(source, kind)| Regex::new(source).ok().map(|re| (re, kind)))
        .collect()
    });

    for (pattern, kind) in patterns {
        if pattern.is_match(path) {
            return kind;
        }
    }
    "unknown"
}

/// Extract a resource id from a chat or knowledge path. Sub-resource
/// segment names are not ids.
#[must_use]
pub fn extract_resource_id(path: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^/api/(?:chats|knowledge)/([^/]+)(?:/|$)").ok())
        .as_ref()?;

    let id = pattern.captures(path)?.get(1)?.as_str();
    const SUB_RESOURCES: [&str; 6] = [
        "files",
        "urls",
        "texts",
        "ui-settings",
        "button-image",
        "suggestions",
    ];
    if SUB_RESOURCES.contains(&id) {
        return None;
    }
    Some(id.to_owned())
}

/// Hands audit events to the warehouse logger without blocking the caller
#[derive(Clone)]
pub struct AuditRecorder {
    logger: Arc<BigQueryLogger>,
}

impl AuditRecorder {
    /// Create a recorder over a shared logger
    #[must_use]
    pub const fn new(logger: Arc<BigQueryLogger>) -> Self {
        Self { logger }
    }

    /// Whether the underlying logger has warehouse credentials
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.logger.is_enabled()
    }

    /// Shared logger handle (tests observe the buffer through it)
    #[must_use]
    pub fn logger(&self) -> Arc<BigQueryLogger> {
        Arc::clone(&self.logger)
    }

    /// Record an event on a detached task: buffer it, then flush promptly.
    /// The HTTP response never waits on this.
    pub fn record(&self, event: AuditEvent) {
        if !self.is_enabled() {
            return;
        }
        let logger = Arc::clone(&self.logger);
        tokio::spawn(async move {
            logger.log(event).await;
            logger.flush().await;
        });
    }
}
