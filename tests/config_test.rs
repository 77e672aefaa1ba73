// ABOUTME: Tests for environment-driven configuration and database bootstrap
// ABOUTME: Env vars are process-global, so these tests run serially
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![allow(missing_docs, clippy::unwrap_used)]

use embedchat_server::config::ServerConfig;
use embedchat_server::database::Database;
use serial_test::serial;
use std::env;

const ALL_VARS: [&str; 8] = [
    "EMBEDCHAT_HTTP_PORT",
    "EMBEDCHAT_DATABASE_URL",
    "EMBEDCHAT_ADMIN_API_KEY",
    "EMBEDCHAT_INFERENCE_BASE_URL",
    "EMBEDCHAT_HTTP_TIMEOUT_SEC",
    "EMBEDCHAT_MAX_UPLOAD_MB",
    "EMBEDCHAT_ALLOWED_ORIGINS",
    "GCP_PROJECT_ID",
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
    env::remove_var("BQ_DATASET_ID");
    env::remove_var("BQ_AUDIT_TABLE");
    env::remove_var("GCP_SERVICE_ACCOUNT_KEY");
    env::remove_var("FIREBASE_PROJECT_ID");
}

#[test]
#[serial]
fn defaults_apply_when_nothing_is_set() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 8081);
    assert_eq!(config.database_url, "sqlite:embedchat.db");
    assert!(config.admin_api_key.is_none());
    assert_eq!(config.inference_base_url, "http://localhost:8000");
    assert_eq!(config.inference_timeout_secs, 120);
    assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
    assert_eq!(config.allowed_origins, vec!["http://localhost:5173"]);
    assert_eq!(config.bigquery_dataset, "ai_chat_logs");
    assert_eq!(config.audit_table, "management_audit_logs");
    assert!(config.google_project_id.is_none());
    assert!(!config.allows_any_origin());
}

#[test]
#[serial]
fn explicit_values_override_defaults() {
    clear_env();
    env::set_var("EMBEDCHAT_HTTP_PORT", "9090");
    env::set_var("EMBEDCHAT_INFERENCE_BASE_URL", "https://infer.internal///");
    env::set_var("EMBEDCHAT_MAX_UPLOAD_MB", "2");
    env::set_var("EMBEDCHAT_ALLOWED_ORIGINS", "https://a.app, https://b.app,https://a.app");
    env::set_var("GCP_PROJECT_ID", "proj-123");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 9090);
    assert_eq!(config.inference_base_url, "https://infer.internal");
    assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    assert_eq!(
        config.allowed_origins,
        vec!["https://a.app", "https://b.app"]
    );
    assert_eq!(config.google_project_id.as_deref(), Some("proj-123"));
    clear_env();
}

#[test]
#[serial]
fn invalid_numbers_fall_back_to_defaults() {
    clear_env();
    env::set_var("EMBEDCHAT_HTTP_PORT", "not-a-port");
    env::set_var("EMBEDCHAT_HTTP_TIMEOUT_SEC", "0");
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 8081);
    assert_eq!(config.inference_timeout_secs, 120);
    clear_env();
}

#[test]
#[serial]
fn wildcard_origin_is_detected() {
    clear_env();
    env::set_var("EMBEDCHAT_ALLOWED_ORIGINS", "*");
    let config = ServerConfig::from_env().unwrap();
    assert!(config.allows_any_origin());
    clear_env();
}

#[tokio::test]
#[serial]
async fn database_bootstrap_creates_the_file_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("embedchat.db");
    let url = format!("sqlite:{}", path.display());

    let database = Database::new(&url).await.unwrap();
    assert!(path.exists());

    // Migrations are idempotent
    database.migrate().await.unwrap();

    // The schema is usable right away
    assert_eq!(database.chats().count().await.unwrap(), 0);
    assert_eq!(database.users().count().await.unwrap(), 0);
}
