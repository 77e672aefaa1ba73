// ABOUTME: Public widget delivery routes: init, chat forwarding, and public profiles
// ABOUTME: Target resolution order: explicit field, then Origin, then Referer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::AppError;
use crate::models::ChatProfile;
use crate::resources::ServerResources;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct InitQuery {
    #[serde(default)]
    target: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct InitPayload {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    origin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    page_context: Option<serde_json::Value>,
    #[serde(default)]
    only_page_context: Option<bool>,
}

/// Widget routes handler
pub struct WidgetRoutes;

impl WidgetRoutes {
    /// Create all widget routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/widget", get(Self::descriptor))
            .route("/widget/health", get(Self::health))
            .route("/widget/init", get(Self::init).post(Self::init_post))
            .route("/widget/chat", post(Self::chat))
            .route("/widget/profile/:chat_id", get(Self::profile))
            .with_state(resources)
    }

    /// Service descriptor
    async fn descriptor() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "service": "embedchat-widget",
            "endpoints": {
                "health": "GET /widget/health",
                "init": "GET /widget/init?target=<domain> or POST /widget/init",
                "chat": "POST /widget/chat",
                "profile": "GET /widget/profile/:chat_id",
            },
        }))
    }

    /// Liveness probe with a storage round-trip
    async fn health(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        sqlx::query("SELECT 1")
            .fetch_one(resources.database.pool())
            .await
            .map_err(|e| AppError::database(format!("health check failed: {e}")))?;
        Ok(Json(serde_json::json!({ "status": "ok", "service": "embedchat-widget" })))
    }

    /// Resolve the widget configuration for the embedding page.
    ///
    /// Target priority: explicit query parameter, then `Origin`, then
    /// `Referer`. Only public fields are returned.
    async fn init(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<InitQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let target = query
            .target
            .filter(|t| !t.trim().is_empty())
            .or_else(|| header_value(&headers, header::ORIGIN))
            .or_else(|| header_value(&headers, header::REFERER))
            .ok_or_else(|| {
                AppError::invalid_input("target parameter or Origin header is required")
            })?;

        let profile = resources
            .resolver()
            .resolve_profile(&target)
            .await?
            .ok_or_else(|| AppError::not_found("chat profile not found for this domain"))?;
        Ok(Json(public_profile(&profile)))
    }

    /// Init variant taking the target from a JSON body
    async fn init_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Option<Json<InitPayload>>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let Json(payload) = payload.unwrap_or_default();
        let target = payload
            .target
            .or(payload.origin)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| header_value(&headers, header::ORIGIN))
            .or_else(|| header_value(&headers, header::REFERER))
            .ok_or_else(|| AppError::invalid_input("target in body or Origin header is required"))?;

        let profile = resources
            .resolver()
            .resolve_profile(&target)
            .await?
            .ok_or_else(|| AppError::not_found("chat profile not found for this domain"))?;
        Ok(Json(public_profile(&profile)))
    }

    /// Forward a visitor message to the inference backend.
    ///
    /// The chat is identified by, in order: explicit `chat_id`, explicit
    /// `target`, then the `Origin`/`Referer` headers.
    async fn chat(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<ChatPayload>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let message = payload
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("message is required"))?;

        let resolver = resources.resolver();
        let mut chat: Option<ChatProfile> = None;
        for key in [
            payload.chat_id.as_deref(),
            payload.target.as_deref(),
            header_value(&headers, header::ORIGIN).as_deref(),
            header_value(&headers, header::REFERER).as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            chat = resolver.resolve_chat(key).await?;
            if chat.is_some() {
                break;
            }
        }
        let chat = chat.ok_or_else(|| {
            AppError::invalid_input("chat_id or target is required to identify the chat profile")
        })?;

        let reply = resources
            .inference
            .chat(
                &chat.id,
                &message,
                payload.page_context.as_ref(),
                payload.only_page_context,
            )
            .await?;
        Ok(Json(reply))
    }

    /// Public profile info by chat id (or registered domain alias)
    async fn profile(
        State(resources): State<Arc<ServerResources>>,
        Path(chat_id): Path<String>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let profile = resources
            .resolver()
            .resolve_chat(&chat_id)
            .await?
            .ok_or_else(|| AppError::not_found("chat profile not found"))?;
        Ok(Json(public_profile(&profile)))
    }
}

/// Public projection of a profile: no prompt, no owner, no target list
fn public_profile(profile: &ChatProfile) -> serde_json::Value {
    serde_json::json!({
        "chat_id": profile.id,
        "display_name": profile.display_name,
        "target_type": profile.target_type,
    })
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .filter(|v| !v.is_empty())
}
