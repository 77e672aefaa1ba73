// ABOUTME: Management audit event DTO streamed to the analytics warehouse
// ABOUTME: Flat wire shape matching the management_audit_logs table schema
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action performed by a management request, derived from the HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// POST
    Create,
    /// PUT / PATCH
    Update,
    /// DELETE
    Delete,
    /// Everything else
    Read,
}

impl AuditAction {
    /// Map an HTTP method name to an action
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        match method.to_uppercase().as_str() {
            "POST" => Self::Create,
            "PUT" | "PATCH" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Read,
        }
    }

    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Read => "read",
        }
    }
}

/// An immutable audit record of one mutating management request.
///
/// The field layout is the exact row shape of the warehouse audit table;
/// the event id doubles as the streaming-insert dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id (also the insert dedup key)
    pub event_id: String,
    /// Event timestamp (RFC 3339)
    pub event_timestamp: String,
    /// Acting operator account id
    pub user_id: String,
    /// Acting operator email
    pub user_email: String,
    /// Action derived from the HTTP method
    pub action: AuditAction,
    /// Resource category (e.g. "chat", "knowledge_file", "ui_settings")
    pub resource_type: String,
    /// Resource id when the path carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Chat profile id when the request is chat-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// HTTP method
    pub request_method: String,
    /// Request path
    pub request_path: String,
    /// Response status code
    pub response_status: u16,
    /// Handler duration in milliseconds
    pub response_duration_ms: u64,
    /// Optional human-readable summary of changed fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes_summary: Option<String>,
    /// Client IP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Client user agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event stamped with a fresh id and the current time
    #[must_use]
    pub fn new(
        user_id: &str,
        user_email: &str,
        action: AuditAction,
        resource_type: &str,
        request_method: &str,
        request_path: &str,
        response_status: u16,
        response_duration_ms: u64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_timestamp: Utc::now().to_rfc3339(),
            user_id: user_id.to_owned(),
            user_email: user_email.to_owned(),
            action,
            resource_type: resource_type.to_owned(),
            resource_id: None,
            chat_id: None,
            request_method: request_method.to_owned(),
            request_path: request_path.to_owned(),
            response_status,
            response_duration_ms,
            changes_summary: None,
            client_ip: None,
            user_agent: None,
        }
    }

    /// Set the resource id
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: String) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Set the chat profile id
    #[must_use]
    pub fn with_chat_id(mut self, chat_id: String) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// Set the changes summary
    #[must_use]
    pub fn with_changes_summary(mut self, summary: String) -> Self {
        self.changes_summary = Some(summary);
        self
    }

    /// Set the client IP address
    #[must_use]
    pub fn with_client_ip(mut self, client_ip: String) -> Self {
        self.client_ip = Some(client_ip);
        self
    }

    /// Set the client user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }
}
