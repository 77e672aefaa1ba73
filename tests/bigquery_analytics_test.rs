// ABOUTME: Integration tests for the BigQuery analytics reader
// ABOUTME: Hourly completeness, fallback equivalence, row decode arity, and UA classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use axum::http::StatusCode;
use axum::{extract::State, response::Json, routing::post, Router};
use common::{service_account_json, spawn_app};
use embedchat_server::external::bigquery::analytics::classify_user_agent;
use embedchat_server::external::bigquery::BigQueryAnalytics;
use std::sync::{Arc, Mutex};

type QueryHandler =
    Arc<dyn Fn(&str) -> Result<serde_json::Value, StatusCode> + Send + Sync + 'static>;

#[derive(Clone)]
struct BqState {
    queries: Arc<Mutex<Vec<String>>>,
    handler: QueryHandler,
}

async fn token_endpoint() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "access_token": "tok", "expires_in": 3600 }))
}

async fn query_endpoint(
    State(state): State<BqState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let query = body["query"].as_str().unwrap_or_default().to_owned();
    assert_eq!(body["useLegacySql"], serde_json::json!(false));
    assert_eq!(body["parameterMode"], "NAMED");
    assert_eq!(body["timeoutMs"], 30_000);
    state.queries.lock().unwrap().push(query.clone());
    (state.handler)(&query).map(Json)
}

async fn analytics_with_mock(handler: QueryHandler) -> (BigQueryAnalytics, BqState) {
    let state = BqState {
        queries: Arc::new(Mutex::new(Vec::new())),
        handler,
    };
    let router = Router::new()
        .route("/token", post(token_endpoint))
        .route("/projects/:project/queries", post(query_endpoint))
        .with_state(state.clone());
    let addr = spawn_app(router).await;

    let key_json = service_account_json();
    let analytics = BigQueryAnalytics::new("test-project", "ai_chat_logs", Some(&key_json))
        .with_api_base(format!("http://{addr}"))
        .with_token_url(format!("http://{addr}/token"));
    (analytics, state)
}

fn row(values: &[Option<&str>]) -> serde_json::Value {
    serde_json::json!({
        "f": values
            .iter()
            .map(|v| serde_json::json!({ "v": v }))
            .collect::<Vec<_>>()
    })
}

#[tokio::test]
async fn hourly_distribution_fills_all_24_hours() {
    let (analytics, _state) = analytics_with_mock(Arc::new(|_query| {
        Ok(serde_json::json!({
            "rows": [
                { "f": [{ "v": "3" }, { "v": "7" }] },
                { "f": [{ "v": "17" }, { "v": "2" }] },
            ]
        }))
    }))
    .await;

    let buckets = analytics
        .hourly_distribution("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap();

    assert_eq!(buckets.len(), 24);
    for (hour, bucket) in buckets.iter().enumerate() {
        assert_eq!(bucket.hour as usize, hour);
        let expected = match hour {
            3 => 7,
            17 => 2,
            _ => 0,
        };
        assert_eq!(bucket.message_count, expected, "hour {hour}");
    }
}

#[tokio::test]
async fn daily_summary_falls_back_when_primary_fails() {
    let (analytics, state) = analytics_with_mock(Arc::new(|query| {
        if query.contains("daily_chat_summary") {
            // Summary table missing
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(serde_json::json!({
            "rows": [{
                "f": [
                    { "v": "2025-01-02" },
                    { "v": "12" },
                    { "v": "4" },
                    { "v": "850.5" },
                    { "v": "0.75" },
                    { "v": "0.1" },
                    { "v": "9001" },
                ]
            }]
        }))
    }))
    .await;

    let rows = analytics
        .daily_summary("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, "2025-01-02");
    assert_eq!(rows[0].total_messages, 12);
    assert_eq!(rows[0].unique_sessions, 4);
    assert!((rows[0].avg_response_time_ms - 850.5).abs() < f64::EPSILON);
    assert!((rows[0].context_found_rate - 0.75).abs() < f64::EPSILON);
    assert!((rows[0].error_rate - 0.1).abs() < f64::EPSILON);
    assert_eq!(rows[0].total_tokens_used, 9001);

    // Both the primary and the fallback query ran
    let queries = state.queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert!(queries[0].contains("daily_chat_summary"));
    assert!(queries[1].contains("chatbot_events"));
}

#[tokio::test]
async fn daily_summary_falls_back_on_empty_primary_result() {
    let (analytics, state) = analytics_with_mock(Arc::new(|query| {
        if query.contains("daily_chat_summary") {
            return Ok(serde_json::json!({}));
        }
        Ok(serde_json::json!({ "rows": [] }))
    }))
    .await;

    let rows = analytics
        .daily_summary("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(state.queries.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn daily_summary_prefers_primary_rows() {
    let (analytics, state) = analytics_with_mock(Arc::new(|query| {
        assert!(query.contains("daily_chat_summary"));
        Ok(serde_json::json!({
            "rows": [{
                "f": [
                    { "v": "2025-01-03" },
                    { "v": "5" },
                    { "v": "2" },
                    { "v": "100" },
                    { "v": "0.5" },
                    { "v": "0" },
                    { "v": "42" },
                ]
            }]
        }))
    }))
    .await;

    let rows = analytics
        .daily_summary("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, "2025-01-03");
    assert_eq!(state.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn populated_errors_array_raises() {
    let (analytics, _state) = analytics_with_mock(Arc::new(|_query| {
        Ok(serde_json::json!({
            "rows": [],
            "errors": [{ "message": "table scan limit exceeded" }],
        }))
    }))
    .await;

    let err = analytics
        .overview("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap_err();
    assert!(err.message.contains("table scan limit exceeded"));
}

#[tokio::test]
async fn row_arity_mismatch_fails_loudly() {
    let (analytics, _state) = analytics_with_mock(Arc::new(|_query| {
        // overview expects 6 columns
        Ok(serde_json::json!({ "rows": [{ "f": [{ "v": "1" }, { "v": "2" }] }] }))
    }))
    .await;

    let err = analytics
        .overview("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap_err();
    assert!(err.message.contains("expected 6"));
}

#[tokio::test]
async fn device_breakdown_classifies_and_sorts() {
    let (analytics, _state) = analytics_with_mock(Arc::new(|_query| {
        Ok(serde_json::json!({
            "rows": [
                row(&[Some("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0 Safari/537.36"), Some("5")]),
                row(&[Some("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0 Safari/537.36 Edg/120.0"), Some("3")]),
                row(&[Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Version/17.0 Mobile/15E148 Safari/604.1"), Some("8")]),
                row(&[Some("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"), Some("1")]),
                row(&[Some("curl/8.4.0"), Some("2")]),
            ]
        }))
    }))
    .await;

    let breakdown = analytics
        .device_breakdown("chat-1", "2025-01-01", "2025-01-31")
        .await
        .unwrap();

    assert_eq!(breakdown[0].device_type, "Mobile");
    assert_eq!(breakdown[0].browser, "Safari");
    assert_eq!(breakdown[0].message_count, 8);
    assert!(breakdown
        .iter()
        .any(|b| b.device_type == "Desktop" && b.browser == "Chrome" && b.message_count == 5));
    assert!(breakdown
        .iter()
        .any(|b| b.device_type == "Desktop" && b.browser == "Edge" && b.message_count == 3));
    assert!(breakdown
        .iter()
        .any(|b| b.device_type == "Desktop" && b.browser == "Firefox" && b.message_count == 1));
    assert!(breakdown
        .iter()
        .any(|b| b.device_type == "Desktop" && b.browser == "Other" && b.message_count == 2));

    // Sorted by descending count
    let counts: Vec<i64> = breakdown.iter().map(|b| b.message_count).collect();
    let mut sorted = counts.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(counts, sorted);
}

#[tokio::test]
async fn message_page_reports_pagination() {
    let (analytics, _state) = analytics_with_mock(Arc::new(|query| {
        if query.contains("COUNT(*)") {
            return Ok(serde_json::json!({ "rows": [{ "f": [{ "v": "3" }] }] }));
        }
        Ok(serde_json::json!({
            "rows": [
                row(&[
                    Some("evt-1"), Some("2025-01-05T10:00:00Z"), Some("chat-1"),
                    Some("hello"), Some("hi there"), Some("acme.com"),
                    Some("120.5"), Some("10"), Some("20"), Some("true"), None,
                ]),
                row(&[
                    Some("evt-2"), Some("2025-01-04T09:00:00Z"), Some("chat-1"),
                    Some("broken?"), None, None,
                    None, None, None, Some("false"), Some("TIMEOUT"),
                ]),
            ]
        }))
    }))
    .await;

    let page = analytics
        .messages("chat-1", "2025-01-01", "2025-01-31", 2, 0, Some("hel"))
        .await
        .unwrap();

    assert_eq!(page.total_count, 3);
    assert_eq!(page.messages.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.next_offset, 2);

    let first = &page.messages[0];
    assert_eq!(first.event_id, "evt-1");
    assert_eq!(first.message_content.as_deref(), Some("hello"));
    assert_eq!(first.total_duration_ms, Some(120.5));
    assert_eq!(first.tokens_input, Some(10));
    assert_eq!(first.context_found, Some(true));
    assert_eq!(first.error_code, None);

    let second = &page.messages[1];
    assert_eq!(second.context_found, Some(false));
    assert_eq!(second.error_code.as_deref(), Some("TIMEOUT"));
    assert_eq!(second.tokens_output, None);
}

#[tokio::test]
async fn disabled_reader_returns_empty_results() {
    let analytics = BigQueryAnalytics::new("", "ai_chat_logs", None);
    assert!(!analytics.is_enabled());

    assert!(analytics
        .daily_summary("c", "2025-01-01", "2025-01-02")
        .await
        .unwrap()
        .is_empty());
    let overview = analytics.overview("c", "2025-01-01", "2025-01-02").await.unwrap();
    assert_eq!(overview.total_messages, 0);
    let page = analytics
        .messages("c", "2025-01-01", "2025-01-02", 50, 10, None)
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);
    assert_eq!(page.next_offset, 10);
    assert!(!page.has_more);
}

#[test]
fn user_agent_precedence_edge_before_chrome_before_safari() {
    let edge = "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/120.0 Safari/537.36 Edg/120.0";
    assert_eq!(classify_user_agent(edge), ("Desktop", "Edge"));

    let chrome = "Mozilla/5.0 (Macintosh) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
    assert_eq!(classify_user_agent(chrome), ("Desktop", "Chrome"));

    let safari = "Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/17.0 Safari/605.1.15";
    assert_eq!(classify_user_agent(safari), ("Desktop", "Safari"));

    let firefox = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    assert_eq!(classify_user_agent(firefox), ("Desktop", "Firefox"));

    let android_chrome = "Mozilla/5.0 (Linux; Android 14) Chrome/120.0 Mobile Safari/537.36";
    assert_eq!(classify_user_agent(android_chrome), ("Mobile", "Chrome"));

    let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0) Version/17.0 Mobile/15E148 Safari/604.1";
    assert_eq!(classify_user_agent(ipad), ("Mobile", "Safari"));

    assert_eq!(classify_user_agent("curl/8.4.0"), ("Desktop", "Other"));
}
