// ABOUTME: BigQuery REST API access without a vendor SDK
// ABOUTME: Query execution, streaming inserts, and OAuth2 JWT-bearer authentication
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! BigQuery over raw REST
//!
//! The runtime has no native BigQuery SDK binding, so this module speaks
//! the REST API directly: parameterized queries through `jobs.query`,
//! streaming inserts through `tabledata.insertAll`, and authentication via
//! the OAuth2 service-account JWT-bearer flow signed from primitives.
//!
//! Missing credentials are not an error. Both clients expose
//! `is_enabled()` and degrade to empty results / dropped events, because
//! analytics must never block primary functionality.

/// Analytics reader over the event warehouse
pub mod analytics;
/// OAuth2 service-account token provider
pub mod auth;
/// Streaming audit-event logger
pub mod logger;

pub use analytics::BigQueryAnalytics;
pub use auth::{GoogleTokenProvider, ServiceAccountKey};
pub use logger::BigQueryLogger;

/// BigQuery REST API base
pub const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// OAuth2 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only scope used by the analytics reader
pub const SCOPE_READONLY: &str = "https://www.googleapis.com/auth/bigquery.readonly";

/// Insert-only scope used by the audit logger
pub const SCOPE_INSERTDATA: &str = "https://www.googleapis.com/auth/bigquery.insertdata";
