// ABOUTME: Main library entry point for the Embedchat management platform
// ABOUTME: Provides the management console API, widget delivery API, and warehouse clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![deny(unsafe_code)]

//! # Embedchat Server
//!
//! Management console and embeddable chat-widget delivery platform for a
//! multi-tenant AI chatbot SaaS. Operators register chat profiles bound to
//! website domains, upload knowledge assets, customize widget appearance,
//! and review usage analytics and audit logs. Chat traffic is forwarded to
//! an external inference backend; usage lands in a BigQuery warehouse
//! spoken over its raw REST API.
//!
//! ## Architecture
//!
//! - **Domain resolution**: canonicalizes inbound origins and maps them to
//!   tenant chat profiles through a two-tier lookup, with ownership-scoped
//!   variants for authenticated contexts.
//! - **Warehouse clients**: a BigQuery analytics reader and audit logger
//!   built directly on the REST API, authenticating with a self-contained
//!   OAuth2 service-account JWT-bearer flow.
//! - **Routes**: thin CRUD handlers for chats, knowledge, widget settings,
//!   analytics, and admin listings.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedchat_server::config::environment::ServerConfig;
//! use embedchat_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Embedchat server configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Authentication: ID-token verification and admin API key checks
pub mod auth;

/// Configuration management from environment variables
pub mod config;

/// Database access: connection pool, migrations, per-table managers
pub mod database;

/// Pure domain/target normalization functions
pub mod domain;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// External service clients (BigQuery warehouse, inference backend)
pub mod external;

/// HTTP middleware: audit capture and widget CORS
pub mod middleware;

/// Common data models re-exported from `embedchat-core`
pub mod models;

/// Shared server state passed to route handlers
pub mod resources;

/// Domain-to-tenant resolution over the backing store
pub mod resolver;

/// `HTTP` routes for the management console and widget APIs
pub mod routes;

/// Audit event construction from request metadata
pub mod security;
