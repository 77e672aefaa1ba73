// ABOUTME: Environment variable driven server configuration with safe defaults
// ABOUTME: Reads EMBEDCHAT_* server settings and GCP_*/BQ_* warehouse settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::AppResult;
use std::env;
use tracing::warn;

/// Full server configuration loaded from the environment.
///
/// Warehouse settings are optional: when the service account key or the
/// project id is absent, the analytics subsystem runs in its explicit
/// disabled state instead of failing startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port (`EMBEDCHAT_HTTP_PORT`, default 8081)
    pub http_port: u16,
    /// `SQLite` database URL (`EMBEDCHAT_DATABASE_URL`, default `sqlite:embedchat.db`)
    pub database_url: String,
    /// Admin API key for server-to-server access (`EMBEDCHAT_ADMIN_API_KEY`)
    pub admin_api_key: Option<String>,
    /// Inference backend base URL (`EMBEDCHAT_INFERENCE_BASE_URL`, default `http://localhost:8000`)
    pub inference_base_url: String,
    /// Outbound request timeout in seconds (`EMBEDCHAT_HTTP_TIMEOUT_SEC`, default 120)
    pub inference_timeout_secs: u64,
    /// Upload size cap in bytes (`EMBEDCHAT_MAX_UPLOAD_MB`, default 50)
    pub max_upload_bytes: usize,
    /// Console origins allowed by CORS (`EMBEDCHAT_ALLOWED_ORIGINS`, comma separated)
    pub allowed_origins: Vec<String>,
    /// Google Cloud project hosting the warehouse (`GCP_PROJECT_ID`)
    pub google_project_id: Option<String>,
    /// Warehouse dataset (`BQ_DATASET_ID`, default `ai_chat_logs`)
    pub bigquery_dataset: String,
    /// Audit log table (`BQ_AUDIT_TABLE`, default `management_audit_logs`)
    pub audit_table: String,
    /// Service account key JSON content (`GCP_SERVICE_ACCOUNT_KEY`)
    pub service_account_key: Option<String>,
    /// Identity project whose ID tokens are accepted (`FIREBASE_PROJECT_ID`)
    pub identity_project_id: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` return keeps room for required
    /// settings without changing call sites.
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            http_port: env_u64("EMBEDCHAT_HTTP_PORT", 8081) as u16,
            database_url: env_str("EMBEDCHAT_DATABASE_URL", "sqlite:embedchat.db"),
            admin_api_key: env_opt("EMBEDCHAT_ADMIN_API_KEY"),
            inference_base_url: env_str("EMBEDCHAT_INFERENCE_BASE_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_owned(),
            inference_timeout_secs: env_u64("EMBEDCHAT_HTTP_TIMEOUT_SEC", 120),
            max_upload_bytes: env_u64("EMBEDCHAT_MAX_UPLOAD_MB", 50) as usize * 1024 * 1024,
            allowed_origins: parse_origins(&env_str(
                "EMBEDCHAT_ALLOWED_ORIGINS",
                "http://localhost:5173",
            )),
            google_project_id: env_opt("GCP_PROJECT_ID"),
            bigquery_dataset: env_str("BQ_DATASET_ID", "ai_chat_logs"),
            audit_table: env_str("BQ_AUDIT_TABLE", "management_audit_logs"),
            service_account_key: env_opt("GCP_SERVICE_ACCOUNT_KEY"),
            identity_project_id: env_opt("FIREBASE_PROJECT_ID"),
        };

        if config.identity_project_id.is_none() {
            warn!("FIREBASE_PROJECT_ID is not set; operator authentication will reject all tokens");
        }
        if config.google_project_id.is_none() || config.service_account_key.is_none() {
            warn!("warehouse credentials not configured; analytics and audit logging are disabled");
        }

        Ok(config)
    }

    /// Whether any origin is allowed (wildcard entry present)
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn env_str(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_owned(),
        _ => default.to_owned(),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(key, value = %raw, "invalid numeric environment value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Split a comma-separated origin list, dropping empties and duplicates
fn parse_origins(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter(|o| seen.insert((*o).to_owned()))
        .map(ToOwned::to_owned)
        .collect();
    if origins.is_empty() {
        vec!["http://localhost:5173".to_owned()]
    } else {
        origins
    }
}
