// ABOUTME: Common data model re-exports from the embedchat-core crate
// ABOUTME: Single import point for DTOs used across the server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

pub use embedchat_core::models::{
    AnalyticsOverview, AuditAction, AuditEvent, ChatMessageRecord, ChatProfile, ChatUiSettings,
    DailySummary, DeviceBreakdown, DomainBreakdown, HourlyBucket, KnowledgeAsset, KnowledgeKind,
    KnowledgeStatus, MessagePage, Suggestion, TargetKind,
};
