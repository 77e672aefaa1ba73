// ABOUTME: Chat profile, domain target, knowledge asset, and widget settings DTOs
// ABOUTME: Canonical definitions with storage-layer string round-tripping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use serde::{Deserialize, Serialize};

/// Channel type a chat profile is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Website domain - targets are canonicalized domains
    Web,
    /// LINE messaging channel - targets are opaque channel identifiers
    Line,
    /// Custom integration - targets are opaque identifiers
    Custom,
}

impl TargetKind {
    /// Parse a raw kind string. Empty input defaults to `Web`; unknown
    /// values collapse to `Custom`.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "" | "web" => Self::Web,
            "line" => Self::Line,
            _ => Self::Custom,
        }
    }

    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Line => "line",
            Self::Custom => "custom",
        }
    }
}

/// A configured chatbot instance owned by one operator account.
///
/// The first entry of `targets` is mirrored onto the legacy `target` column
/// for older widget embeds that still read the single-value field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProfile {
    /// Tenant alias - unique, immutable after creation
    pub id: String,
    /// Legacy single-value target (always equals `targets[0]`)
    pub target: String,
    /// All targets bound to this profile, canonicalized, first-seen order
    pub targets: Vec<String>,
    /// Channel type
    pub target_type: TargetKind,
    /// Human-readable name shown in the console and widget header
    pub display_name: String,
    /// System prompt forwarded to the inference backend
    pub system_prompt: String,
    /// Owning operator account id
    pub owner_user_id: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Kind of knowledge asset attached to a chat profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeKind {
    /// Uploaded document
    File,
    /// Crawled web page
    Url,
    /// Pasted free text
    Text,
}

impl KnowledgeKind {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
            Self::Text => "text",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "url" => Self::Url,
            "text" => Self::Text,
            _ => Self::File,
        }
    }
}

/// Ingestion status of a knowledge asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeStatus {
    /// Accepted, not yet forwarded to the inference backend
    Pending,
    /// Forwarded, awaiting embedding
    Processing,
    /// Embedded and searchable
    Succeeded,
    /// Forwarding or embedding failed (see `error_message`)
    Failed,
}

impl KnowledgeStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "processing" => Self::Processing,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// A knowledge asset attached to a chat profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeAsset {
    /// Asset id
    pub id: String,
    /// Owning chat profile id
    pub chat_id: String,
    /// Asset kind
    #[serde(rename = "type")]
    pub kind: KnowledgeKind,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Source URL for crawled pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Original filename for uploads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    /// Object storage path for uploads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    /// Ingestion status
    pub status: KnowledgeStatus,
    /// Number of embedded chunks
    pub embedding_count: i64,
    /// Failure detail when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Vector store point id assigned by the inference backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_point_id: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Ordered suggestion chip displayed in the widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Suggestion id
    pub id: String,
    /// Suggestion text
    pub text: String,
    /// Display order (ascending)
    pub order_index: i64,
    /// Whether the suggestion is shown
    pub enabled: bool,
}

/// Widget appearance settings for a chat profile.
///
/// Theme and widget settings are free-form JSON documents edited by the
/// console UI; the server stores them opaquely and only supplies defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUiSettings {
    /// Settings row id (empty string for synthesized defaults)
    pub id: String,
    /// Owning chat profile id
    pub chat_id: String,
    /// Colors and labels document
    pub theme_settings: serde_json::Value,
    /// Button, window, and banner document
    pub widget_settings: serde_json::Value,
    /// Creation timestamp (RFC 3339, empty for synthesized defaults)
    pub created_at: String,
    /// Last update timestamp (RFC 3339, empty for synthesized defaults)
    pub updated_at: String,
}

impl ChatUiSettings {
    /// Default settings document for a profile that has never been customized
    #[must_use]
    pub fn defaults_for(chat_id: &str) -> Self {
        Self {
            id: String::new(),
            chat_id: chat_id.to_owned(),
            theme_settings: default_theme_settings(),
            widget_settings: default_widget_settings(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

/// Default theme document: color palette and text labels
#[must_use]
pub fn default_theme_settings() -> serde_json::Value {
    serde_json::json!({
        "colors": {
            "headerBackground": "#4a90e2",
            "headerText": "#ffffff",
            "bodyBackground": "#f5f5f5",
            "containerBackground": "#ffffff",
            "messagesBackground": "#ffffff",
            "botMessageBackground": "#f8f9fa",
            "botMessageText": "#333333",
            "botMessageBorder": "#e9ecef",
            "userMessageBackground": "#4a90e2",
            "userMessageGradientEnd": "#357abd",
            "userMessageText": "#ffffff",
            "inputAreaBackground": "#f8f9fa",
            "inputBackground": "#ffffff",
            "inputText": "#333333",
            "inputBorder": "#e9ecef",
            "inputBorderFocus": "#4a90e2",
            "accentColor": "#4a90e2",
            "accentHover": "#357abd"
        },
        "labels": {
            "headerTitle": "AI Chat Bot",
            "inputPlaceholder": "Type a message...",
            "welcomeMessage": "Hello! How can I help you today?"
        }
    })
}

/// Default widget document: launcher button and window geometry
#[must_use]
pub fn default_widget_settings() -> serde_json::Value {
    serde_json::json!({
        "button": {
            "size": 64,
            "bottom": 20,
            "right": 20,
            "color": "#4a90e2",
            "label": "\u{1f4ac}",
            "closeLabel": "\u{2715}"
        },
        "window": {
            "width": "400px",
            "height": "600px",
            "mobileWidth": "calc(100vw - 20px)",
            "mobileHeight": "calc(100vh - 150px)"
        },
        "banner": {}
    })
}
