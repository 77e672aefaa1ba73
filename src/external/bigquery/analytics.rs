// ABOUTME: BigQuery analytics reader for dashboard metrics
// ABOUTME: Parameterized queries, typed positional row decoding, and summary fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Analytics reader
//!
//! Issues parameterized SQL over the `jobs.query` REST endpoint and decodes
//! BigQuery's columnar `{f: [{v}]}` row format. Each operation owns the
//! SELECT column order of its query; the [`QueryRow`] decoder checks arity
//! once per row and fails loudly on mismatch instead of silently
//! misaligning fields.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

use super::auth::{GoogleTokenProvider, ServiceAccountKey};
use super::{DEFAULT_API_BASE, SCOPE_READONLY};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AnalyticsOverview, ChatMessageRecord, DailySummary, DeviceBreakdown, DomainBreakdown,
    HourlyBucket, MessagePage,
};

/// Server-side query timeout sent with every request
const QUERY_TIMEOUT_MS: u64 = 30_000;

/// Hard cap on message page size
const MAX_MESSAGE_LIMIT: i64 = 100;

/// A typed named query parameter
#[derive(Debug, Clone)]
pub struct QueryParam {
    name: &'static str,
    param_type: &'static str,
    value: String,
}

impl QueryParam {
    /// STRING parameter
    #[must_use]
    pub fn string(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            param_type: "STRING",
            value: value.into(),
        }
    }

    /// DATE parameter (`YYYY-MM-DD`)
    #[must_use]
    pub fn date(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            param_type: "DATE",
            value: value.into(),
        }
    }

    /// INT64 parameter
    #[must_use]
    pub fn int64(name: &'static str, value: i64) -> Self {
        Self {
            name,
            param_type: "INT64",
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Option<Vec<RawRow>>,
    #[serde(default)]
    errors: Option<Vec<QueryResponseError>>,
}

#[derive(Debug, Deserialize)]
struct QueryResponseError {
    #[serde(default)]
    message: String,
}

/// One row in BigQuery's columnar response format
#[derive(Debug, Deserialize)]
pub struct RawRow {
    f: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(default)]
    v: Option<String>,
}

/// Typed positional accessor over one decoded row.
///
/// Constructed with the expected column count of the owning query; an
/// arity mismatch is an error at the decode boundary.
pub struct QueryRow {
    cells: Vec<Option<String>>,
}

impl QueryRow {
    fn from_raw(raw: RawRow, expected_columns: usize) -> AppResult<Self> {
        if raw.f.len() != expected_columns {
            return Err(AppError::external_service(
                "BigQuery",
                format!(
                    "row has {} columns, expected {expected_columns}",
                    raw.f.len()
                ),
            ));
        }
        Ok(Self {
            cells: raw.f.into_iter().map(|c| c.v).collect(),
        })
    }

    fn raw(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(Option::as_deref)
    }

    fn str(&self, index: usize) -> String {
        self.raw(index).unwrap_or_default().to_owned()
    }

    fn opt_str(&self, index: usize) -> Option<String> {
        self.raw(index).map(ToOwned::to_owned)
    }

    fn i64(&self, index: usize) -> i64 {
        self.raw(index).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    fn opt_i64(&self, index: usize) -> Option<i64> {
        self.raw(index).and_then(|v| v.parse().ok())
    }

    fn f64(&self, index: usize) -> f64 {
        self.raw(index).and_then(|v| v.parse().ok()).unwrap_or(0.0)
    }

    fn opt_f64(&self, index: usize) -> Option<f64> {
        self.raw(index).and_then(|v| v.parse().ok())
    }

    fn bool(&self, index: usize) -> Option<bool> {
        self.raw(index).map(|v| v == "true")
    }
}

/// BigQuery analytics reader for one project/dataset
pub struct BigQueryAnalytics {
    project_id: String,
    dataset_id: String,
    api_base: String,
    auth: GoogleTokenProvider,
    http: reqwest::Client,
}

impl BigQueryAnalytics {
    /// Create a reader. A missing or unparsable service account key puts
    /// the reader into the disabled state.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        service_account_key_json: Option<&str>,
    ) -> Self {
        let credentials = service_account_key_json.and_then(ServiceAccountKey::from_json);
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
            auth: GoogleTokenProvider::new(credentials, SCOPE_READONLY),
            http: reqwest::Client::new(),
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

    fn events_table(&self) -> String {
        format!("`{}.{}.chatbot_events`", self.project_id, self.dataset_id)
    }

    fn summary_table(&self) -> String {
        format!(
            "`{}.{}.daily_chat_summary`",
            self.project_id, self.dataset_id
        )
    }

    /// Execute a parameterized query. `Ok(None)` when the reader is
    /// disabled or no token could be obtained (analytics unavailable).
    ///
    /// # Errors
    ///
    /// Returns an error on a non-2xx response or a populated `errors[]`.
    async fn execute_query(
        &self,
        query: &str,
        parameters: &[QueryParam],
    ) -> AppResult<Option<Vec<RawRow>>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let Some(access_token) = self.auth.token().await else {
            return Ok(None);
        };

        let url = format!("{}/projects/{}/queries", self.api_base, self.project_id);
        let query_parameters: Vec<serde_json::Value> = parameters
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "parameterType": { "type": p.param_type },
                    "parameterValue": { "value": p.value },
                })
            })
            .collect();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({
                "query": query,
                "useLegacySql": false,
                "parameterMode": "NAMED",
                "queryParameters": query_parameters,
                "timeoutMs": QUERY_TIMEOUT_MS,
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service("BigQuery", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                "BigQuery",
                format!("query failed with HTTP {status}: {body}"),
            ));
        }

        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("BigQuery", format!("JSON parse error: {e}")))?;

        if let Some(errors) = result.errors {
            if let Some(first) = errors.first() {
                return Err(AppError::external_service("BigQuery", first.message.clone()));
            }
        }

        Ok(Some(result.rows.unwrap_or_default()))
    }

    /// Daily summary rows for a date range.
    ///
    /// Reads the pre-aggregated summary table first; when that query fails
    /// or yields nothing, transparently re-runs an equivalent aggregation
    /// over the raw event table with the same parameters and output shape.
    ///
    /// # Errors
    ///
    /// Returns an error when the fallback aggregation itself fails.
    pub async fn daily_summary(
        &self,
        chat_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<Vec<DailySummary>> {
        let params = [
            QueryParam::string("chatId", chat_id),
            QueryParam::date("startDate", start_date),
            QueryParam::date("endDate", end_date),
        ];

        let primary = format!(
            "SELECT
               FORMAT_DATE('%Y-%m-%d', date) as date,
               total_messages,
               unique_sessions,
               avg_response_time_ms,
               context_found_rate,
               error_rate,
               total_tokens_used
             FROM {}
             WHERE chat_id = @chatId
               AND date BETWEEN @startDate AND @endDate
             ORDER BY date ASC",
            self.summary_table()
        );

        match self.execute_query(&primary, &params).await {
            Ok(None) => return Ok(Vec::new()),
            Ok(Some(rows)) if !rows.is_empty() => {
                return rows.into_iter().map(decode_summary_row).collect();
            }
            Ok(Some(_)) => {}
            Err(e) => {
                warn!(error = %e, "daily summary query failed, falling back to raw events");
            }
        }

        let fallback = format!(
            "SELECT
               FORMAT_DATE('%Y-%m-%d', DATE(event_timestamp)) as date,
               COUNT(*) as total_messages,
               COUNT(DISTINCT request_id) as unique_sessions,
               AVG(total_duration_ms) as avg_response_time_ms,
               SAFE_DIVIDE(COUNTIF(context_found = true), COUNT(*)) as context_found_rate,
               SAFE_DIVIDE(COUNTIF(error_code IS NOT NULL), COUNT(*)) as error_rate,
               SUM(COALESCE(tokens_input, 0) + COALESCE(tokens_output, 0)) as total_tokens_used
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'
             GROUP BY date
             ORDER BY date ASC",
            self.events_table()
        );

        let Some(rows) = self.execute_query(&fallback, &params).await? else {
            return Ok(Vec::new());
        };
        rows.into_iter().map(decode_summary_row).collect()
    }

    /// Aggregated overview for a date range; zeroed when no data exists
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub async fn overview(
        &self,
        chat_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<AnalyticsOverview> {
        let query = format!(
            "SELECT
               COUNT(*) as total_messages,
               COUNT(DISTINCT request_id) as total_sessions,
               AVG(total_duration_ms) as avg_response_time_ms,
               SAFE_DIVIDE(COUNTIF(error_code IS NOT NULL), COUNT(*)) as error_rate,
               SAFE_DIVIDE(COUNTIF(context_found = true), COUNT(*)) as context_found_rate,
               SUM(COALESCE(tokens_input, 0) + COALESCE(tokens_output, 0)) as total_tokens_used
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'",
            self.events_table()
        );

        let Some(rows) = self
            .execute_query(
                &query,
                &[
                    QueryParam::string("chatId", chat_id),
                    QueryParam::date("startDate", start_date),
                    QueryParam::date("endDate", end_date),
                ],
            )
            .await?
        else {
            return Ok(AnalyticsOverview::zeroed());
        };

        let Some(raw) = rows.into_iter().next() else {
            return Ok(AnalyticsOverview::zeroed());
        };
        let row = QueryRow::from_raw(raw, 6)?;
        Ok(AnalyticsOverview {
            total_messages: row.i64(0),
            total_sessions: row.i64(1),
            avg_response_time_ms: row.f64(2),
            error_rate: row.f64(3),
            context_found_rate: row.f64(4),
            total_tokens_used: row.i64(5),
        })
    }

    /// Hourly message distribution. Always returns exactly 24 buckets;
    /// hours absent from the result set are zero-filled.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub async fn hourly_distribution(
        &self,
        chat_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<Vec<HourlyBucket>> {
        let query = format!(
            "SELECT
               EXTRACT(HOUR FROM event_timestamp) as hour,
               COUNT(*) as message_count
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'
             GROUP BY hour
             ORDER BY hour",
            self.events_table()
        );

        let mut counts = [0_i64; 24];
        if let Some(rows) = self
            .execute_query(
                &query,
                &[
                    QueryParam::string("chatId", chat_id),
                    QueryParam::date("startDate", start_date),
                    QueryParam::date("endDate", end_date),
                ],
            )
            .await?
        {
            for raw in rows {
                let row = QueryRow::from_raw(raw, 2)?;
                let hour = row.i64(0);
                if (0..24).contains(&hour) {
                    counts[hour as usize] = row.i64(1);
                }
            }
        }

        Ok(counts
            .iter()
            .enumerate()
            .map(|(hour, &message_count)| HourlyBucket {
                hour: hour as u8,
                message_count,
            })
            .collect())
    }

    /// Top 10 origin domains by message count
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub async fn domain_breakdown(
        &self,
        chat_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<Vec<DomainBreakdown>> {
        let query = format!(
            "SELECT
               COALESCE(origin_domain, 'unknown') as origin_domain,
               COUNT(*) as message_count,
               AVG(total_duration_ms) as avg_response_time_ms
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'
             GROUP BY origin_domain
             ORDER BY message_count DESC
             LIMIT 10",
            self.events_table()
        );

        let Some(rows) = self
            .execute_query(
                &query,
                &[
                    QueryParam::string("chatId", chat_id),
                    QueryParam::date("startDate", start_date),
                    QueryParam::date("endDate", end_date),
                ],
            )
            .await?
        else {
            return Ok(Vec::new());
        };

        rows.into_iter()
            .map(|raw| {
                let row = QueryRow::from_raw(raw, 3)?;
                Ok(DomainBreakdown {
                    origin_domain: if row.str(0).is_empty() {
                        "unknown".to_owned()
                    } else {
                        row.str(0)
                    },
                    message_count: row.i64(1),
                    avg_response_time_ms: row.f64(2),
                })
            })
            .collect()
    }

    /// Device class and browser breakdown, classified from raw user-agent
    /// strings and sorted by descending message count
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub async fn device_breakdown(
        &self,
        chat_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<Vec<DeviceBreakdown>> {
        let query = format!(
            "SELECT
               user_agent,
               COUNT(*) as message_count
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'
               AND user_agent IS NOT NULL
             GROUP BY user_agent",
            self.events_table()
        );

        let Some(rows) = self
            .execute_query(
                &query,
                &[
                    QueryParam::string("chatId", chat_id),
                    QueryParam::date("startDate", start_date),
                    QueryParam::date("endDate", end_date),
                ],
            )
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut buckets: HashMap<(&'static str, &'static str), i64> = HashMap::new();
        for raw in rows {
            let row = QueryRow::from_raw(raw, 2)?;
            let key = classify_user_agent(&row.str(0));
            *buckets.entry(key).or_insert(0) += row.i64(1);
        }

        let mut breakdown: Vec<DeviceBreakdown> = buckets
            .into_iter()
            .map(|((device_type, browser), message_count)| DeviceBreakdown {
                device_type: device_type.to_owned(),
                browser: browser.to_owned(),
                message_count,
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then_with(|| a.device_type.cmp(&b.device_type))
                .then_with(|| a.browser.cmp(&b.browser))
        });
        Ok(breakdown)
    }

    /// Paginated message search, newest first. `limit` is clamped to 100.
    ///
    /// # Errors
    ///
    /// Returns an error when either the count or page query fails.
    pub async fn messages(
        &self,
        chat_id: &str,
        start_date: &str,
        end_date: &str,
        limit: i64,
        offset: i64,
        search: Option<&str>,
    ) -> AppResult<MessagePage> {
        if !self.is_enabled() {
            return Ok(MessagePage::empty(offset));
        }
        let limit = limit.clamp(1, MAX_MESSAGE_LIMIT);
        let search_filter = "(
               @searchQuery = ''
               OR LOWER(COALESCE(message_content, '')) LIKE CONCAT('%', LOWER(@searchQuery), '%')
               OR LOWER(COALESCE(response_content, '')) LIKE CONCAT('%', LOWER(@searchQuery), '%')
             )";

        let count_query = format!(
            "SELECT COUNT(*) as total_count
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'
               AND {search_filter}",
            self.events_table()
        );

        let base_params = [
            QueryParam::string("chatId", chat_id),
            QueryParam::date("startDate", start_date),
            QueryParam::date("endDate", end_date),
            QueryParam::string("searchQuery", search.unwrap_or_default()),
        ];

        let total_count = match self.execute_query(&count_query, &base_params).await? {
            Some(rows) => match rows.into_iter().next() {
                Some(raw) => QueryRow::from_raw(raw, 1)?.i64(0),
                None => 0,
            },
            None => return Ok(MessagePage::empty(offset)),
        };

        let page_query = format!(
            "SELECT
               event_id,
               event_timestamp,
               chat_id,
               message_content,
               response_content,
               origin_domain,
               total_duration_ms,
               tokens_input,
               tokens_output,
               context_found,
               error_code
             FROM {}
             WHERE chat_id = @chatId
               AND DATE(event_timestamp) BETWEEN @startDate AND @endDate
               AND event_type = 'chat_request'
               AND {search_filter}
             ORDER BY event_timestamp DESC
             LIMIT @limit OFFSET @offset",
            self.events_table()
        );

        let mut page_params = base_params.to_vec();
        page_params.push(QueryParam::int64("limit", limit));
        page_params.push(QueryParam::int64("offset", offset));

        let rows = self
            .execute_query(&page_query, &page_params)
            .await?
            .unwrap_or_default();

        let messages: Vec<ChatMessageRecord> = rows
            .into_iter()
            .map(|raw| {
                let row = QueryRow::from_raw(raw, 11)?;
                Ok(ChatMessageRecord {
                    event_id: row.str(0),
                    event_timestamp: row.str(1),
                    chat_id: row.str(2),
                    message_content: row.opt_str(3),
                    response_content: row.opt_str(4),
                    origin_domain: row.opt_str(5),
                    total_duration_ms: row.opt_f64(6),
                    tokens_input: row.opt_i64(7),
                    tokens_output: row.opt_i64(8),
                    context_found: row.bool(9),
                    error_code: row.opt_str(10),
                })
            })
            .collect::<AppResult<_>>()?;

        let next_offset = offset + limit;
        Ok(MessagePage {
            messages,
            total_count,
            has_more: next_offset < total_count,
            next_offset,
        })
    }
}

fn decode_summary_row(raw: RawRow) -> AppResult<DailySummary> {
    let row = QueryRow::from_raw(raw, 7)?;
    Ok(DailySummary {
        date: row.str(0),
        total_messages: row.i64(1),
        unique_sessions: row.i64(2),
        avg_response_time_ms: row.f64(3),
        context_found_rate: row.f64(4),
        error_rate: row.f64(5),
        total_tokens_used: row.i64(6),
    })
}

/// Classify a user-agent string into (device type, browser).
///
/// Precedence matters: Edge UA strings also contain `chrome/`, and Chrome
/// UA strings also contain `safari/`, so Edge is checked before Chrome and
/// Chrome before Safari.
#[must_use]
pub fn classify_user_agent(user_agent: &str) -> (&'static str, &'static str) {
    fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
        cell.get_or_init(|| Regex::new(source).ok()).as_ref()
    }

    static MOBILE: OnceLock<Option<Regex>> = OnceLock::new();
    static EDGE: OnceLock<Option<Regex>> = OnceLock::new();
    static CHROME: OnceLock<Option<Regex>> = OnceLock::new();
    static SAFARI: OnceLock<Option<Regex>> = OnceLock::new();
    static FIREFOX: OnceLock<Option<Regex>> = OnceLock::new();

    let matches = |cell: &'static OnceLock<Option<Regex>>, source: &str| {
        pattern(cell, source).is_some_and(|re| re.is_match(user_agent))
    };

    let device_type = if matches(&MOBILE, r"(?i)mobile|android|iphone|ipad|ipod") {
        "Mobile"
    } else {
        "Desktop"
    };

    let is_edge = matches(&EDGE, r"(?i)edg/");
    let is_chrome = matches(&CHROME, r"(?i)chrome/");
    let browser = if is_edge {
        "Edge"
    } else if is_chrome {
        "Chrome"
    } else if matches(&SAFARI, r"(?i)safari/") {
        "Safari"
    } else if matches(&FIREFOX, r"(?i)firefox/") {
        "Firefox"
    } else {
        "Other"
    };

    (device_type, browser)
}
