// ABOUTME: Analytics response rows produced by the warehouse reader
// ABOUTME: Dashboard-facing DTOs serialized in camelCase
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use serde::{Deserialize, Serialize};

/// One day of aggregated chat activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    /// Day in `YYYY-MM-DD`
    pub date: String,
    /// Total chat messages handled
    pub total_messages: i64,
    /// Distinct widget sessions
    pub unique_sessions: i64,
    /// Mean end-to-end response time
    pub avg_response_time_ms: f64,
    /// Share of messages where knowledge context was found (0..=1)
    pub context_found_rate: f64,
    /// Share of messages that errored (0..=1)
    pub error_rate: f64,
    /// Total input + output tokens
    pub total_tokens_used: i64,
}

/// Aggregated metrics over a whole date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    /// Total chat messages handled
    pub total_messages: i64,
    /// Distinct widget sessions
    pub total_sessions: i64,
    /// Mean end-to-end response time
    pub avg_response_time_ms: f64,
    /// Share of messages that errored (0..=1)
    pub error_rate: f64,
    /// Share of messages where knowledge context was found (0..=1)
    pub context_found_rate: f64,
    /// Total input + output tokens
    pub total_tokens_used: i64,
}

impl AnalyticsOverview {
    /// All-zero overview used when the range holds no data
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            total_messages: 0,
            total_sessions: 0,
            avg_response_time_ms: 0.0,
            error_rate: 0.0,
            context_found_rate: 0.0,
            total_tokens_used: 0,
        }
    }
}

/// Message count for one hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBucket {
    /// Hour of day, 0..=23
    pub hour: u8,
    /// Messages observed in that hour across the range
    pub message_count: i64,
}

/// Per-origin-domain traffic breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainBreakdown {
    /// Canonical origin domain, or "unknown"
    pub origin_domain: String,
    /// Messages from that domain
    pub message_count: i64,
    /// Mean response time for that domain
    pub avg_response_time_ms: f64,
}

/// Device class and browser traffic breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBreakdown {
    /// "Mobile" or "Desktop"
    pub device_type: String,
    /// "Chrome", "Safari", "Firefox", "Edge", or "Other"
    pub browser: String,
    /// Messages from that bucket
    pub message_count: i64,
}

/// One chat exchange as stored in the event table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRecord {
    /// Event id
    pub event_id: String,
    /// Event timestamp as returned by the warehouse
    pub event_timestamp: String,
    /// Chat profile id
    pub chat_id: String,
    /// Visitor message content
    pub message_content: Option<String>,
    /// Bot response content
    pub response_content: Option<String>,
    /// Origin domain the message came from
    pub origin_domain: Option<String>,
    /// End-to-end duration
    pub total_duration_ms: Option<f64>,
    /// Prompt tokens
    pub tokens_input: Option<i64>,
    /// Completion tokens
    pub tokens_output: Option<i64>,
    /// Whether knowledge context was found
    pub context_found: Option<bool>,
    /// Error code when the exchange failed
    pub error_code: Option<String>,
}

/// Paginated message search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Messages on this page, newest first
    pub messages: Vec<ChatMessageRecord>,
    /// Total messages matching the filter
    pub total_count: i64,
    /// Whether another page exists
    pub has_more: bool,
    /// Offset of the next page
    pub next_offset: i64,
}

impl MessagePage {
    /// Empty page anchored at `offset`
    #[must_use]
    pub const fn empty(offset: i64) -> Self {
        Self {
            messages: Vec::new(),
            total_count: 0,
            has_more: false,
            next_offset: offset,
        }
    }
}
