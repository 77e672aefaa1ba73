// ABOUTME: Dashboard analytics routes backed by the warehouse reader
// ABOUTME: Ownership-checked, date-validated, degrading to empty payloads when disabled
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::routes::require_user;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::error;

const NOT_ENABLED: &str = "Analytics not enabled";

#[derive(Debug, Deserialize)]
pub(crate) struct RangeQuery {
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    search: Option<String>,
}

struct ValidatedRange {
    chat_id: String,
    start_date: String,
    end_date: String,
}

/// Analytics routes handler
pub struct AnalyticsRoutes;

impl AnalyticsRoutes {
    /// Create all analytics routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/analytics/summary", get(Self::summary))
            .route("/api/analytics/overview", get(Self::overview))
            .route("/api/analytics/hourly", get(Self::hourly))
            .route("/api/analytics/domains", get(Self::domains))
            .route("/api/analytics/devices", get(Self::devices))
            .route("/api/analytics/messages", get(Self::messages))
            .with_state(resources)
    }

    /// Validate range parameters and chat ownership
    async fn validate(
        resources: &Arc<ServerResources>,
        headers: &HeaderMap,
        query: &RangeQuery,
    ) -> Result<ValidatedRange, AppError> {
        let user = require_user(resources, headers).await?;

        let (Some(chat_id), Some(start_date), Some(end_date)) = (
            query.chat_id.clone(),
            query.start_date.clone(),
            query.end_date.clone(),
        ) else {
            return Err(AppError::invalid_input(
                "chat_id, start_date, and end_date are required",
            ));
        };
        if !is_valid_date(&start_date) || !is_valid_date(&end_date) {
            return Err(AppError::invalid_input(
                "Invalid date format. Use YYYY-MM-DD",
            ));
        }

        resources
            .database
            .chats()
            .get_owned(&chat_id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        Ok(ValidatedRange {
            chat_id,
            start_date,
            end_date,
        })
    }

    /// Daily summary rows
    async fn summary(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<RangeQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let range = Self::validate(&resources, &headers, &query).await?;
        if !resources.analytics.is_enabled() {
            return Ok(Json(serde_json::json!({ "data": [], "message": NOT_ENABLED })));
        }
        let data = resources
            .analytics
            .daily_summary(&range.chat_id, &range.start_date, &range.end_date)
            .await
            .map_err(query_failed)?;
        Ok(Json(serde_json::json!({ "data": data })))
    }

    /// Aggregated overview metrics
    async fn overview(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<RangeQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let range = Self::validate(&resources, &headers, &query).await?;
        if !resources.analytics.is_enabled() {
            let mut payload = serde_json::to_value(crate::models::AnalyticsOverview::zeroed())
                .unwrap_or_default();
            payload["message"] = serde_json::Value::String(NOT_ENABLED.to_owned());
            return Ok(Json(payload));
        }
        let data = resources
            .analytics
            .overview(&range.chat_id, &range.start_date, &range.end_date)
            .await
            .map_err(query_failed)?;
        Ok(Json(serde_json::to_value(data).unwrap_or_default()))
    }

    /// Hourly distribution, always 24 buckets
    async fn hourly(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<RangeQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let range = Self::validate(&resources, &headers, &query).await?;
        if !resources.analytics.is_enabled() {
            return Ok(Json(serde_json::json!({ "data": [], "message": NOT_ENABLED })));
        }
        let data = resources
            .analytics
            .hourly_distribution(&range.chat_id, &range.start_date, &range.end_date)
            .await
            .map_err(query_failed)?;
        Ok(Json(serde_json::json!({ "data": data })))
    }

    /// Top origin domains
    async fn domains(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<RangeQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let range = Self::validate(&resources, &headers, &query).await?;
        if !resources.analytics.is_enabled() {
            return Ok(Json(serde_json::json!({ "data": [], "message": NOT_ENABLED })));
        }
        let data = resources
            .analytics
            .domain_breakdown(&range.chat_id, &range.start_date, &range.end_date)
            .await
            .map_err(query_failed)?;
        Ok(Json(serde_json::json!({ "data": data })))
    }

    /// Device and browser breakdown
    async fn devices(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<RangeQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let range = Self::validate(&resources, &headers, &query).await?;
        if !resources.analytics.is_enabled() {
            return Ok(Json(serde_json::json!({ "data": [], "message": NOT_ENABLED })));
        }
        let data = resources
            .analytics
            .device_breakdown(&range.chat_id, &range.start_date, &range.end_date)
            .await
            .map_err(query_failed)?;
        Ok(Json(serde_json::json!({ "data": data })))
    }

    /// Paginated message search
    async fn messages(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<RangeQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let range = Self::validate(&resources, &headers, &query).await?;
        let limit = query.limit.unwrap_or(50).min(100);
        let offset = query.offset.unwrap_or(0).max(0);

        if !resources.analytics.is_enabled() {
            return Ok(Json(serde_json::json!({
                "messages": [],
                "totalCount": 0,
                "hasMore": false,
                "nextOffset": offset,
                "message": NOT_ENABLED,
            })));
        }
        let page = resources
            .analytics
            .messages(
                &range.chat_id,
                &range.start_date,
                &range.end_date,
                limit,
                offset,
                query.search.as_deref(),
            )
            .await
            .map_err(query_failed)?;
        Ok(Json(serde_json::to_value(page).unwrap_or_default()))
    }
}

/// Dashboard reads surface warehouse failures as a generic server error;
/// the client shows its "failed to load" banner without detail leakage
fn query_failed(e: AppError) -> AppError {
    error!(error = %e, "analytics query failed");
    AppError::internal(e.message)
}

/// `YYYY-MM-DD` check
fn is_valid_date(value: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}
