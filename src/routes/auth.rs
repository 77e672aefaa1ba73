// ABOUTME: Session and identity routes
// ABOUTME: Token introspection and logout acknowledgment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::routes::authenticate;
use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Auth routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all auth routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/me", get(Self::me))
            .route("/api/auth/logout", post(Self::logout))
            .with_state(resources)
    }

    /// Return the identity behind the presented token
    async fn me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = authenticate(&resources, &headers)
            .await?
            .ok_or_else(|| AppError::auth_required("unauthorized"))?;
        Ok(Json(serde_json::json!({
            "user": { "id": user.id, "email": user.email }
        })))
    }

    /// Sessions are bearer-token based; logout is client-side
    async fn logout() -> Json<serde_json::Value> {
        Json(serde_json::json!({ "ok": true }))
    }
}
