// ABOUTME: Database operations for widget UI settings and suggestion chips
// ABOUTME: Opaque JSON documents with default fallback, wholesale suggestion replacement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::{AppError, AppResult};
use crate::models::{ChatUiSettings, Suggestion};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::warn;
use uuid::Uuid;

/// Incoming suggestion row; a missing id means a fresh chip
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SuggestionInput {
    /// Existing id to keep, or None for a new one
    #[serde(default)]
    pub id: Option<String>,
    /// Suggestion text
    pub text: String,
    /// Display order
    #[serde(default)]
    pub order_index: Option<i64>,
    /// Whether the suggestion is shown
    #[serde(default)]
    pub enabled: bool,
}

/// Widget settings database operations
pub struct WidgetSettingsManager {
    pool: SqlitePool,
}

impl WidgetSettingsManager {
    /// Create a new manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch UI settings for a chat. Unparsable stored documents fall back
    /// to defaults rather than erroring.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn ui_settings(&self, chat_id: &str) -> AppResult<Option<ChatUiSettings>> {
        let row = sqlx::query(
            r"
            SELECT id, chat_id, theme_settings, widget_settings, created_at, updated_at
            FROM chat_ui_settings
            WHERE chat_id = $1
            ",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get ui settings: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let theme_raw: String = row.get("theme_settings");
        let widget_raw: String = row.get("widget_settings");
        Ok(Some(ChatUiSettings {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            theme_settings: parse_or_default(&theme_raw, chat_id, "theme_settings", || {
                embedchat_core::models::chat::default_theme_settings()
            }),
            widget_settings: parse_or_default(&widget_raw, chat_id, "widget_settings", || {
                embedchat_core::models::chat::default_widget_settings()
            }),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Create or overwrite the UI settings documents for a chat
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert_ui_settings(
        &self,
        chat_id: &str,
        theme_settings: &serde_json::Value,
        widget_settings: &serde_json::Value,
    ) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let theme_json = theme_settings.to_string();
        let widget_json = widget_settings.to_string();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r"
            INSERT INTO chat_ui_settings (id, chat_id, theme_settings, widget_settings, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT(chat_id) DO UPDATE SET
                theme_settings = excluded.theme_settings,
                widget_settings = excluded.widget_settings,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&id)
        .bind(chat_id)
        .bind(&theme_json)
        .bind(&widget_json)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert ui settings: {e}")))?;
        Ok(())
    }

    /// Fetch suggestions in display order
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn suggestions(&self, chat_id: &str) -> AppResult<Vec<Suggestion>> {
        let rows = sqlx::query(
            r"
            SELECT id, text, order_index, enabled
            FROM chat_suggestions
            WHERE chat_id = $1
            ORDER BY order_index ASC
            ",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list suggestions: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| Suggestion {
                id: r.get("id"),
                text: r.get("text"),
                order_index: r.get("order_index"),
                enabled: r.get::<i64, _>("enabled") == 1,
            })
            .collect())
    }

    /// Replace the full suggestion set for a chat
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn replace_suggestions(
        &self,
        chat_id: &str,
        suggestions: &[SuggestionInput],
    ) -> AppResult<Vec<Suggestion>> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query("DELETE FROM chat_suggestions WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear suggestions: {e}")))?;

        for (idx, suggestion) in suggestions.iter().enumerate() {
            let id = suggestion
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let order_index = suggestion.order_index.unwrap_or(idx as i64);
            sqlx::query(
                r"
                INSERT INTO chat_suggestions (id, chat_id, text, order_index, enabled, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                ",
            )
            .bind(&id)
            .bind(chat_id)
            .bind(&suggestion.text)
            .bind(order_index)
            .bind(i64::from(suggestion.enabled))
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to insert suggestion: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit suggestions: {e}")))?;

        self.suggestions(chat_id).await
    }
}

fn parse_or_default(
    raw: &str,
    chat_id: &str,
    field: &str,
    default: impl FnOnce() -> serde_json::Value,
) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) if value.as_object().is_some_and(|o| !o.is_empty()) => value,
        Ok(_) => default(),
        Err(e) => {
            warn!(chat_id, field, error = %e, "stored settings document unparsable, using defaults");
            default()
        }
    }
}
