// ABOUTME: Shared server state passed to all route handlers
// ABOUTME: Owns the database, warehouse clients, verifier, and inference client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::external::bigquery::{BigQueryAnalytics, BigQueryLogger};
use crate::external::inference::InferenceClient;
use crate::resolver::DomainResolver;
use crate::security::AuditRecorder;
use std::sync::Arc;

/// Dependency container constructed once at startup and shared across
/// request handlers behind an `Arc`
pub struct ServerResources {
    /// Server configuration
    pub config: ServerConfig,
    /// Database pool and managers
    pub database: Database,
    /// ID-token verifier (black-box identity provider)
    pub verifier: Arc<dyn TokenVerifier>,
    /// Warehouse analytics reader
    pub analytics: Arc<BigQueryAnalytics>,
    /// Audit recorder over the warehouse logger
    pub audit: AuditRecorder,
    /// Inference backend client
    pub inference: InferenceClient,
}

impl ServerResources {
    /// Wire up warehouse and inference clients from configuration
    #[must_use]
    pub fn new(config: ServerConfig, database: Database, verifier: Arc<dyn TokenVerifier>) -> Self {
        let project_id = config.google_project_id.clone().unwrap_or_default();
        let key_json = config.service_account_key.as_deref();

        let analytics = Arc::new(BigQueryAnalytics::new(
            project_id.clone(),
            config.bigquery_dataset.clone(),
            key_json,
        ));
        let logger = Arc::new(BigQueryLogger::new(
            project_id,
            config.bigquery_dataset.clone(),
            config.audit_table.clone(),
            key_json,
        ));
        let inference = InferenceClient::new(
            config.inference_base_url.clone(),
            config.admin_api_key.clone(),
            config.inference_timeout_secs,
        );

        Self {
            config,
            database,
            verifier,
            analytics,
            audit: AuditRecorder::new(logger),
            inference,
        }
    }

    /// Stateless resolver over the profile store
    #[must_use]
    pub fn resolver(&self) -> DomainResolver {
        DomainResolver::new(self.database.chats())
    }
}
