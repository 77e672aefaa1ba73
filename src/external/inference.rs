// ABOUTME: HTTP client for the inference backend (chat and knowledge ingestion)
// ABOUTME: Thin forwarding layer; non-2xx responses surface as external service errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::{AppError, AppResult};
use serde_json::Value;
use std::time::Duration;

/// Client for the inference backend that answers chat messages and embeds
/// knowledge content into the vector store
#[derive(Clone)]
pub struct InferenceClient {
    base_url: String,
    admin_api_key: Option<String>,
    http: reqwest::Client,
}

impl InferenceClient {
    /// Create a client with a per-request timeout
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        admin_api_key: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            admin_api_key,
            http,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.admin_api_key {
            builder = builder.header("X-Admin-API-Key", key);
        }
        builder
    }

    async fn handle(&self, response: reqwest::Response) -> AppResult<Value> {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<Value>(&text).ok();
        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("error"))
                .and_then(Value::as_str)
                .map_or_else(|| format!("backend returned {status}"), ToOwned::to_owned);
            return Err(AppError::external_service("inference backend", message));
        }
        Ok(parsed.unwrap_or(Value::Null))
    }

    /// Forward a visitor chat message
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn chat(
        &self,
        chat_id: &str,
        message: &str,
        page_context: Option<&Value>,
        only_page_context: Option<bool>,
    ) -> AppResult<Value> {
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "message": message,
        });
        if let Some(context) = page_context {
            payload["page_context"] = context.clone();
        }
        if let Some(only) = only_page_context {
            payload["only_page_context"] = Value::Bool(only);
        }
        let response = self
            .request(reqwest::Method::POST, "/api/chat")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await
    }

    /// Forward pasted knowledge text for embedding
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn add_knowledge_text(
        &self,
        chat_id: &str,
        title: &str,
        content: &str,
        category: &str,
        tags: &[String],
    ) -> AppResult<Value> {
        let response = self
            .request(reqwest::Method::POST, "/api/add_knowledge")
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "title": title,
                "content": content,
                "category": category,
                "tags": tags,
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await
    }

    /// Ask the backend to crawl and embed a URL
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn fetch_url(&self, chat_id: &str, url: &str, title: &str) -> AppResult<Value> {
        let response = self
            .request(reqwest::Method::POST, "/api/fetch_url")
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "url": url,
                "title": title,
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await
    }

    /// Upload a document for extraction and embedding
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn upload_file(
        &self,
        chat_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<Value> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)
            .map_err(|e| AppError::invalid_input(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("chat_id", chat_id.to_owned());

        let response = self
            .request(reqwest::Method::POST, "/api/upload_file")
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await
    }

    /// Fetch stored knowledge content by vector point id
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn get_knowledge(&self, vector_point_id: &str) -> AppResult<Value> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/api/knowledge/{vector_point_id}"),
            )
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await
    }

    /// Update stored knowledge content by vector point id
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn update_knowledge(
        &self,
        vector_point_id: &str,
        chat_id: &str,
        title: Option<&str>,
        text: Option<&str>,
    ) -> AppResult<Value> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/api/knowledge/{vector_point_id}"),
            )
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "title": title,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await
    }

    /// Delete stored knowledge content by vector point id
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or rejects the call.
    pub async fn delete_knowledge(&self, vector_point_id: &str, chat_id: &str) -> AppResult<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/api/knowledge/{vector_point_id}?chat_id={chat_id}"),
            )
            .send()
            .await
            .map_err(|e| AppError::external_service("inference backend", e.to_string()))?;
        self.handle(response).await.map(|_| ())
    }
}
