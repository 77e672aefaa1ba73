// ABOUTME: Shared data models for the Embedchat platform
// ABOUTME: Canonical DTO definitions used by the server and its tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! # Embedchat Core
//!
//! Canonical data transfer objects shared across the Embedchat server:
//! chat profile and target models, warehouse audit events, and analytics
//! response rows. Pure data definitions - no I/O lives in this crate.

/// Data model definitions
pub mod models;

pub use models::{
    AnalyticsOverview, AuditAction, AuditEvent, ChatMessageRecord, ChatProfile, ChatUiSettings,
    DailySummary, DeviceBreakdown, DomainBreakdown, HourlyBucket, KnowledgeAsset, KnowledgeKind,
    KnowledgeStatus, MessagePage, Suggestion, TargetKind,
};
