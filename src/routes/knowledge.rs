// ABOUTME: Knowledge asset routes: uploads, URLs, texts, and content round-trips
// ABOUTME: Forwards content to the inference backend and tracks ingestion status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::database::NewKnowledgeAsset;
use crate::errors::AppError;
use crate::models::{KnowledgeKind, KnowledgeStatus};
use crate::resources::ServerResources;
use crate::routes::require_user;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UrlPayload {
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextPayload {
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdatePayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Knowledge routes handler
pub struct KnowledgeRoutes;

impl KnowledgeRoutes {
    /// Create all knowledge routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/knowledge", get(Self::list))
            .route("/api/knowledge/files", post(Self::upload_file))
            .route("/api/knowledge/urls", post(Self::add_url))
            .route("/api/knowledge/texts", post(Self::add_text))
            .route(
                "/api/knowledge/:id",
                get(Self::get).put(Self::update).delete(Self::delete),
            )
            .with_state(resources)
    }

    /// List assets for the caller's chats, optionally filtered by chat
    async fn list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let items = resources
            .database
            .knowledge()
            .list_for_owner(&user.id, query.chat_id.as_deref())
            .await?;
        Ok(Json(serde_json::json!({ "items": items })))
    }

    /// Accept a document upload and forward it for embedding.
    ///
    /// The asset row is created first (pending), moved to processing while
    /// the backend call is in flight, then settled to succeeded or failed.
    async fn upload_file(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;

        let mut chat_key: Option<String> = None;
        let mut title = String::new();
        let mut file: Option<(String, String, Vec<u8>)> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::invalid_input(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                // First non-empty key wins, matching form field priority
                "chat_id" | "domain" | "target" => {
                    let value = field.text().await.unwrap_or_default();
                    if chat_key.is_none() && !value.trim().is_empty() {
                        chat_key = Some(value.trim().to_owned());
                    }
                }
                "title" => {
                    title = field.text().await.unwrap_or_default().trim().to_owned();
                }
                "file" => {
                    let filename = field.file_name().unwrap_or("upload").to_owned();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_owned();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::invalid_input(format!("file read failed: {e}")))?;
                    file = Some((filename, content_type, bytes.to_vec()));
                }
                _ => {}
            }
        }

        let chat_key =
            chat_key.ok_or_else(|| AppError::invalid_input("chat_id or target is required"))?;
        let chat = resources
            .resolver()
            .resolve_chat_for_owner(&chat_key, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;

        let (filename, content_type, bytes) =
            file.ok_or_else(|| AppError::invalid_input("file is required"))?;
        if bytes.len() > resources.config.max_upload_bytes {
            return Err(AppError::invalid_input("file is too large"));
        }

        let knowledge = resources.database.knowledge();
        let record_id = knowledge
            .insert(NewKnowledgeAsset {
                chat_id: chat.id.clone(),
                kind: KnowledgeKind::File,
                title,
                source_url: String::new(),
                original_filename: filename.clone(),
                storage_path: filename.clone(),
                status: KnowledgeStatus::Pending,
            })
            .await?;
        knowledge
            .set_status(&record_id, KnowledgeStatus::Processing, "", &filename)
            .await?;

        match resources
            .inference
            .upload_file(&chat.id, &filename, &content_type, bytes)
            .await
        {
            Ok(backend) => {
                knowledge
                    .set_status(&record_id, KnowledgeStatus::Succeeded, "", &filename)
                    .await?;
                if let Some(point_id) = backend.get("qdrant_point_id").and_then(|v| v.as_str()) {
                    knowledge.set_vector_point(&record_id, point_id).await?;
                }
                Ok(Json(serde_json::json!({
                    "id": record_id,
                    "status": "succeeded",
                    "backend": backend,
                })))
            }
            Err(e) => {
                knowledge
                    .set_status(&record_id, KnowledgeStatus::Failed, &e.message, &filename)
                    .await?;
                Err(e)
            }
        }
    }

    /// Register a URL for crawling and embedding
    async fn add_url(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<UrlPayload>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let key = payload
            .chat_id
            .or(payload.target)
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        let url = payload
            .url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());
        let (Some(key), Some(url)) = (key, url) else {
            return Err(AppError::invalid_input(
                "chat_id (or target) and url are required",
            ));
        };

        let chat = resources
            .resolver()
            .resolve_chat_for_owner(&key, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;
        let title = payload.title.unwrap_or_default();

        let knowledge = resources.database.knowledge();
        let record_id = knowledge
            .insert(NewKnowledgeAsset {
                chat_id: chat.id.clone(),
                kind: KnowledgeKind::Url,
                title: title.clone(),
                source_url: url.clone(),
                original_filename: String::new(),
                storage_path: String::new(),
                status: KnowledgeStatus::Processing,
            })
            .await?;

        match resources.inference.fetch_url(&chat.id, &url, &title).await {
            Ok(backend) => {
                knowledge
                    .set_status(&record_id, KnowledgeStatus::Succeeded, "", "")
                    .await?;
                if let Some(point_id) = backend.get("qdrant_point_id").and_then(|v| v.as_str()) {
                    knowledge.set_vector_point(&record_id, point_id).await?;
                }
                Ok(Json(serde_json::json!({
                    "id": record_id,
                    "status": "succeeded",
                    "backend": backend,
                })))
            }
            Err(e) => {
                knowledge
                    .set_status(&record_id, KnowledgeStatus::Failed, &e.message, "")
                    .await?;
                Err(e)
            }
        }
    }

    /// Register pasted text for embedding
    async fn add_text(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(payload): Json<TextPayload>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let key = payload
            .chat_id
            .or(payload.target)
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        let content = payload.content.filter(|c| !c.trim().is_empty());
        let (Some(key), Some(content)) = (key, content) else {
            return Err(AppError::invalid_input(
                "chat_id (or target) and content are required",
            ));
        };

        let chat = resources
            .resolver()
            .resolve_chat_for_owner(&key, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("chat not found"))?;
        let title = payload.title.unwrap_or_default();

        let knowledge = resources.database.knowledge();
        let record_id = knowledge
            .insert(NewKnowledgeAsset {
                chat_id: chat.id.clone(),
                kind: KnowledgeKind::Text,
                title: title.clone(),
                source_url: String::new(),
                original_filename: String::new(),
                storage_path: String::new(),
                status: KnowledgeStatus::Processing,
            })
            .await?;

        match resources
            .inference
            .add_knowledge_text(
                &chat.id,
                &title,
                &content,
                payload.category.as_deref().unwrap_or_default(),
                payload.tags.as_deref().unwrap_or_default(),
            )
            .await
        {
            Ok(backend) => {
                knowledge
                    .set_status(&record_id, KnowledgeStatus::Succeeded, "", "")
                    .await?;
                if let Some(point_id) = backend.get("qdrant_point_id").and_then(|v| v.as_str()) {
                    knowledge.set_vector_point(&record_id, point_id).await?;
                }
                Ok(Json(serde_json::json!({
                    "id": record_id,
                    "status": "succeeded",
                    "backend": backend,
                })))
            }
            Err(e) => {
                knowledge
                    .set_status(&record_id, KnowledgeStatus::Failed, &e.message, "")
                    .await?;
                Err(e)
            }
        }
    }

    /// Fetch an asset with its stored content when available
    async fn get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let asset = resources
            .database
            .knowledge()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("knowledge not found"))?;

        let Some(point_id) = asset.vector_point_id.clone() else {
            // Metadata only; nothing stored in the vector store to edit
            return Ok(Json(serde_json::json!({
                "id": asset.id,
                "chat_id": asset.chat_id,
                "type": asset.kind,
                "title": asset.title.clone().unwrap_or_default(),
                "text": serde_json::Value::Null,
                "source_url": asset.source_url,
                "original_filename": asset.original_filename,
                "status": asset.status,
                "created_at": asset.created_at,
                "updated_at": asset.updated_at,
                "editable": false,
            })));
        };

        let content = resources.inference.get_knowledge(&point_id).await?;
        let title = content
            .get("title")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned)
            .or(asset.title.clone())
            .unwrap_or_default();
        let text = content
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();

        Ok(Json(serde_json::json!({
            "id": asset.id,
            "chat_id": asset.chat_id,
            "type": asset.kind,
            "title": title,
            "text": text,
            "source_url": asset.source_url,
            "original_filename": asset.original_filename,
            "status": asset.status,
            "created_at": asset.created_at,
            "updated_at": asset.updated_at,
            "editable": true,
        })))
    }

    /// Update stored content through the inference backend
    async fn update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(payload): Json<UpdatePayload>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let asset = resources
            .database
            .knowledge()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("knowledge not found"))?;
        let point_id = asset.vector_point_id.ok_or_else(|| {
            AppError::invalid_input("cannot update knowledge without stored content")
        })?;

        resources
            .inference
            .update_knowledge(
                &point_id,
                &asset.chat_id,
                payload.title.as_deref(),
                payload.text.as_deref(),
            )
            .await?;

        if let Some(title) = payload.title {
            resources.database.knowledge().set_title(&id, &title).await?;
        }

        Ok(Json(serde_json::json!({ "success": true, "updated": true })))
    }

    /// Delete an asset, removing stored content best-effort first
    async fn delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let user = require_user(&resources, &headers).await?;
        let asset = resources
            .database
            .knowledge()
            .get_owned(&id, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("knowledge not found"))?;

        if let Some(point_id) = &asset.vector_point_id {
            // Vector store cleanup failure must not block the metadata delete
            if let Err(e) = resources
                .inference
                .delete_knowledge(point_id, &asset.chat_id)
                .await
            {
                error!(error = %e, point_id, "failed to delete stored knowledge content");
            }
        }

        resources.database.knowledge().delete(&id).await?;
        Ok(Json(serde_json::json!({ "deleted": true })))
    }
}
