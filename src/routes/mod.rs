// ABOUTME: Route module organization and router assembly
// ABOUTME: Shared authentication guards and the top-level axum router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Route modules
//!
//! Each domain gets its own module with a `XRoutes::routes(resources)`
//! constructor returning a ready `Router`. Handlers stay thin: guard,
//! delegate to a manager or client, map to a response.

/// Admin listing routes (API key only)
pub mod admin;
/// Dashboard analytics routes
pub mod analytics;
/// Session and identity routes
pub mod auth;
/// Chat profile CRUD, UI settings, and suggestions
pub mod chats;
/// Knowledge asset routes with inference backend forwarding
pub mod knowledge;
/// Public widget delivery routes
pub mod widget;

use crate::auth::{admin_key_matches, bearer_token, AuthUser};
use crate::errors::{AppError, AppResult};
use crate::middleware::{audit_middleware, widget_cors};
use crate::resources::ServerResources;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Assemble the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    let management = Router::new()
        .merge(auth::AuthRoutes::routes(resources.clone()))
        .merge(chats::ChatRoutes::routes(resources.clone()))
        .merge(knowledge::KnowledgeRoutes::routes(resources.clone()))
        .merge(analytics::AnalyticsRoutes::routes(resources.clone()))
        .merge(admin::AdminRoutes::routes(resources.clone()))
        .layer(axum::middleware::from_fn_with_state(
            resources.clone(),
            audit_middleware,
        ))
        .layer(management_cors(&resources));

    let widget = widget::WidgetRoutes::routes(resources.clone()).layer(
        axum::middleware::from_fn_with_state(resources.clone(), widget_cors),
    );

    Router::new()
        .route("/health", get(health))
        .with_state(resources.clone())
        .merge(management)
        .merge(widget)
        .layer(DefaultBodyLimit::max(resources.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Console CORS: static allowlist from configuration, or mirrored origins
/// in wildcard mode
fn management_cors(resources: &Arc<ServerResources>) -> CorsLayer {
    let allow_origin = if resources.config.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            resources
                .config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-admin-api-key"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Liveness probe with a storage round-trip
async fn health(State(resources): State<Arc<ServerResources>>) -> Json<serde_json::Value> {
    let database_ok = sqlx::query("SELECT 1")
        .fetch_one(resources.database.pool())
        .await
        .is_ok();
    let status = if database_ok { "ok" } else { "degraded" };
    Json(serde_json::json!({ "status": status }))
}

/// Caller identity for endpoints that accept either credential
pub(crate) enum Caller {
    /// Server-to-server caller holding the admin API key
    Admin,
    /// Console operator with a verified ID token
    User(AuthUser),
}

/// Authenticate an operator: verified ID token with a verified email.
/// Refreshes the account row as a side effect.
pub(crate) async fn require_user(
    resources: &Arc<ServerResources>,
    headers: &HeaderMap,
) -> AppResult<AuthUser> {
    let user = authenticate(resources, headers)
        .await?
        .ok_or_else(|| AppError::auth_required("login required"))?;
    if !user.email_verified {
        return Err(AppError::forbidden("email verification required"));
    }
    if let Err(e) = resources
        .database
        .users()
        .upsert(&user.id, &user.email, user.email_verified)
        .await
    {
        // Account bookkeeping must not block the request
        warn!(error = %e, user_id = %user.id, "failed to refresh user row");
    }
    Ok(user)
}

/// Verify a bearer ID token if present; `None` for absent or rejected
pub(crate) async fn authenticate(
    resources: &Arc<ServerResources>,
    headers: &HeaderMap,
) -> AppResult<Option<AuthUser>> {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
    else {
        return Ok(None);
    };
    resources.verifier.verify(token).await
}

/// Require the admin API key header
pub(crate) fn require_admin(
    resources: &Arc<ServerResources>,
    headers: &HeaderMap,
) -> AppResult<()> {
    let expected = resources.config.admin_api_key.as_deref().unwrap_or("");
    let provided = headers
        .get("x-admin-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if admin_key_matches(expected, provided) {
        Ok(())
    } else {
        Err(AppError::auth_required("admin api key required"))
    }
}

/// Accept either the admin API key (server-to-server) or an operator token
pub(crate) async fn require_admin_or_user(
    resources: &Arc<ServerResources>,
    headers: &HeaderMap,
    query_api_key: Option<&str>,
) -> AppResult<Caller> {
    let expected = resources.config.admin_api_key.as_deref().unwrap_or("");
    let provided = headers
        .get("x-admin-api-key")
        .and_then(|v| v.to_str().ok())
        .or(query_api_key)
        .unwrap_or("");
    if admin_key_matches(expected, provided) {
        return Ok(Caller::Admin);
    }
    require_user(resources, headers).await.map(Caller::User)
}
