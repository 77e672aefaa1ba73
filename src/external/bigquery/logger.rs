// ABOUTME: Streaming audit-event logger over the BigQuery insertAll endpoint
// ABOUTME: Buffered fire-and-forget inserts, never retried, buffer capped at 50
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Audit-event streaming
//!
//! Events are buffered in memory and flushed as streaming inserts with the
//! event id as `insertId` for warehouse-side dedup. The buffer drains
//! unconditionally on flush - a failed POST drops the batch after logging,
//! because re-queueing would either grow without bound or amplify
//! duplicates. Audit logging is invisible to the request path by design.

use tokio::sync::Mutex;
use tracing::{error, warn};

use super::auth::{GoogleTokenProvider, ServiceAccountKey};
use super::{DEFAULT_API_BASE, SCOPE_INSERTDATA};
use crate::models::AuditEvent;

/// Automatic flush threshold
pub const MAX_BUFFER_SIZE: usize = 50;

#[derive(Debug, serde::Deserialize)]
struct InsertAllResponse {
    #[serde(rename = "insertErrors", default)]
    insert_errors: Option<Vec<serde_json::Value>>,
}

/// Buffered streaming-insert logger for one audit table
pub struct BigQueryLogger {
    project_id: String,
    dataset_id: String,
    table_id: String,
    api_base: String,
    auth: GoogleTokenProvider,
    http: reqwest::Client,
    buffer: Mutex<Vec<AuditEvent>>,
}

impl BigQueryLogger {
    /// Create a logger. A missing or unparsable service account key puts
    /// the logger into the disabled state: events are dropped silently.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
        service_account_key_json: Option<&str>,
    ) -> Self {
        let credentials = service_account_key_json.and_then(ServiceAccountKey::from_json);
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
            auth: GoogleTokenProvider::new(credentials, SCOPE_INSERTDATA),
            http: reqwest::Client::new(),
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Override the API base URL (tests)
    #[must_use]
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Override the OAuth token endpoint (tests)
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.auth = self.auth.with_token_url(url);
        self
    }

    /// Whether credentials and a project are configured
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.auth.is_enabled() && !self.project_id.is_empty()
    }

    /// Number of events currently buffered
    pub async fn buffered(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Buffer an event, flushing automatically when the buffer reaches
    /// [`MAX_BUFFER_SIZE`]. Never fails; failures are logged only.
    pub async fn log(&self, event: AuditEvent) {
        if !self.is_enabled() {
            return;
        }
        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(event);
            buffer.len() >= MAX_BUFFER_SIZE
        };
        if should_flush {
            self.flush().await;
        }
    }

    /// Drain the buffer into one streaming insert. The buffer is cleared
    /// whether or not the insert succeeds; partial insert errors are
    /// logged and never retried.
    pub async fn flush(&self) {
        if !self.is_enabled() {
            return;
        }
        let events = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        let Some(access_token) = self.auth.token().await else {
            error!(
                dropped = events.len(),
                "no access token for audit insert, dropping batch"
            );
            return;
        };

        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.api_base, self.project_id, self.dataset_id, self.table_id
        );
        let rows: Vec<serde_json::Value> = events
            .iter()
            .map(|event| {
                serde_json::json!({
                    "insertId": event.event_id,
                    "json": event,
                })
            })
            .collect();

        let response = match self
            .http
            .post(&url)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({ "rows": rows }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, dropped = events.len(), "audit insert request failed");
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, body, dropped = events.len(), "audit insert rejected");
            return;
        }

        match response.json::<InsertAllResponse>().await {
            Ok(result) => {
                if let Some(errors) = result.insert_errors {
                    if !errors.is_empty() {
                        warn!(count = errors.len(), "partial audit insert errors");
                    }
                }
            }
            Err(e) => warn!(error = %e, "audit insert response unparsable"),
        }
    }
}
