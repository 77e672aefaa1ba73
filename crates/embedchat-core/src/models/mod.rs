// ABOUTME: Model module organization for shared Embedchat DTOs
// ABOUTME: Re-exports chat, audit, and analytics model types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

/// Analytics response rows returned by the warehouse reader
pub mod analytics;
/// Management audit events streamed to the warehouse
pub mod audit;
/// Chat profiles, domain targets, knowledge assets, and widget settings
pub mod chat;

pub use analytics::{
    AnalyticsOverview, ChatMessageRecord, DailySummary, DeviceBreakdown, DomainBreakdown,
    HourlyBucket, MessagePage,
};
pub use audit::{AuditAction, AuditEvent};
pub use chat::{
    ChatProfile, ChatUiSettings, KnowledgeAsset, KnowledgeKind, KnowledgeStatus, Suggestion,
    TargetKind,
};
