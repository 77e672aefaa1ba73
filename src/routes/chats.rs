// ABOUTME: Chat profile CRUD routes plus widget UI settings and suggestions
// ABOUTME: All operations ownership-scoped; target sets are normalized at the edge
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::database::{NewChatProfile, SuggestionInput, UpdateChatProfile};
use crate::domain::{normalize_targets, sanitize_chat_id};
use crate::errors::AppError;
use crate::models::{ChatUiSettings, TargetKind};
use crate::resources::ServerResources;
use crate::routes::{require_admin_or_user, require_user, Caller};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Payload for registering or updating a chat profile
#[derive(Debug, Deserialize)]
pub struct ChatProfilePayload {
    /// Singular target (legacy clients)
    #[serde(default)]
    pub target: Option<String>,
    /// Explicit target list
    #[serde(default)]
    pub targets: Option<Vec<String>>,
    /// Channel type
    #[serde(default)]
    pub target_type: Option<String>,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// System prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListChatsQuery {
    #[serde(default)]
    admin_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UiSettingsPayload {
    #[serde(default)]
    theme_settings: Option<serde_json::Value>,
    #[serde(default)]
    widget_settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionsPayload {
    suggestions: Vec<SuggestionInput>,
}

/// Chat profile routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chats", get(Self::list).post(Self::create))
            .route(
                "/api/chats/:id",
                get(Self::get).put(Self::update).delete(Self::delete),
            )
            .route(
                "/api/chats/:id/ui-settings",
                get(Self::ui_settings).put(Self::put_ui_settings),
            )
            .route(
                "/api/chats/:id/suggestions",
                get(Self::suggestions).put(Self::put_suggestions),
            )
            .with_state(resources)
    }

    /// List profiles. The admin API key sees every tenant
    /// (server-to-server); operators see their own.
    async fn list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListChatsQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let caller =
            require_admin_or_user(&resources, &headers, query.admin_api_key.as_deref()).await?;
        let owner = match &caller {
            Caller::Admin => None,
            Caller::User(user) => Some(user.id.as_str()),
        };
        let chats = resources.database.chats().list(owner).await?;
        Ok(Json(serde_json::json!({ "chats": chats })))
    }

    /// Register a new profile with at least one normalized target
    async fn create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<ChatProfilePayload>,
    ) -> Result<Response, AppError> {
        let user = require_user(&resources, &headers).await?;

        let target_type = TargetKind::from_raw(payload.target_type.as_deref().unwrap_or_default());
        let targets = normalize_targets(
            payload.targets.as_deref(),
            payload.target.as_deref(),
            target_type,
        );
        if targets.is_empty() {
            return Err(AppError::invalid_input("at least one target is required"));
        }

        let display_name = payload
            .display_name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "New chat".to_owned());

        let chat = resources
            .database
            .chats()
            .create(NewChatProfile {
                id: Uuid::new_v4().to_string(),
                targets,
                target_type,
                display_name,
                system_prompt: payload.system_prompt.unwrap_or_default(),
                owner_user_id: user.id,
            })
            .await?;

        Ok((StatusCode::CREATED, Json(chat)).into_response())
    }

    /// Fetch an owned profile
    async fn get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);
        let chat = resources
            .database
            .chats()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;
        Ok(Json(chat).into_response())
    }

    /// Partial update; a provided target set replaces the old one wholesale
    async fn update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(payload): Json<ChatProfilePayload>,
    ) -> Result<Response, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);

        let current = resources
            .database
            .chats()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        let next_type = payload
            .target_type
            .as_deref()
            .map(TargetKind::from_raw)
            .unwrap_or(current.target_type);

        let new_targets = if payload.targets.is_some() {
            Some(normalize_targets(payload.targets.as_deref(), None, next_type))
        } else if payload.target.is_some() {
            Some(normalize_targets(None, payload.target.as_deref(), next_type))
        } else {
            None
        };
        if let Some(targets) = &new_targets {
            if targets.is_empty() {
                return Err(AppError::invalid_input("at least one target is required"));
            }
        }

        let changes = UpdateChatProfile {
            target_type: payload.target_type.as_deref().map(TargetKind::from_raw),
            targets: new_targets,
            display_name: payload.display_name.map(|n| n.trim().to_owned()),
            system_prompt: payload.system_prompt,
        };

        if changes.target_type.is_none()
            && changes.targets.is_none()
            && changes.display_name.is_none()
            && changes.system_prompt.is_none()
        {
            return Ok(Json(serde_json::json!({ "updated": false })).into_response());
        }

        let chat = resources
            .database
            .chats()
            .update(&id, &user.id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;
        Ok(Json(chat).into_response())
    }

    /// Delete an owned profile and its dependent rows
    async fn delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);
        if resources.database.chats().delete(&id, &user.id).await? {
            Ok(Json(serde_json::json!({ "deleted": true })))
        } else {
            Err(AppError::not_found("chat not found"))
        }
    }

    /// Fetch UI settings, synthesizing defaults when never customized
    async fn ui_settings(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<ChatUiSettings>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);
        resources
            .database
            .chats()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        let settings = resources
            .database
            .widget_settings()
            .ui_settings(&id)
            .await?
            .unwrap_or_else(|| ChatUiSettings::defaults_for(&id));
        Ok(Json(settings))
    }

    /// Overwrite UI settings documents
    async fn put_ui_settings(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(payload): Json<UiSettingsPayload>,
    ) -> Result<Json<ChatUiSettings>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);
        resources
            .database
            .chats()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        let theme = payload
            .theme_settings
            .unwrap_or_else(|| serde_json::json!({}));
        let widget = payload
            .widget_settings
            .unwrap_or_else(|| serde_json::json!({}));
        resources
            .database
            .widget_settings()
            .upsert_ui_settings(&id, &theme, &widget)
            .await?;

        let settings = resources
            .database
            .widget_settings()
            .ui_settings(&id)
            .await?
            .unwrap_or_else(|| ChatUiSettings::defaults_for(&id));
        Ok(Json(settings))
    }

    /// Fetch suggestion chips in display order
    async fn suggestions(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);
        resources
            .database
            .chats()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        let suggestions = resources.database.widget_settings().suggestions(&id).await?;
        Ok(Json(serde_json::json!({ "suggestions": suggestions })))
    }

    /// Replace the full suggestion set
    async fn put_suggestions(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(payload): Json<SuggestionsPayload>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let id = sanitize_chat_id(&id);
        resources
            .database
            .chats()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        let suggestions = resources
            .database
            .widget_settings()
            .replace_suggestions(&id, &payload.suggestions)
            .await?;
        Ok(Json(serde_json::json!({ "suggestions": suggestions })))
    }
}
