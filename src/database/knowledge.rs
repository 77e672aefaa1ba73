// ABOUTME: Database operations for knowledge assets attached to chat profiles
// ABOUTME: Tracks ingestion status transitions around inference backend forwarding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::{AppError, AppResult};
use crate::models::{KnowledgeAsset, KnowledgeKind, KnowledgeStatus};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Payload for inserting a knowledge asset record
#[derive(Debug, Clone)]
pub struct NewKnowledgeAsset {
    /// Owning chat profile id
    pub chat_id: String,
    /// Asset kind
    pub kind: KnowledgeKind,
    /// Display title (empty becomes NULL)
    pub title: String,
    /// Source URL for crawled pages (empty becomes NULL)
    pub source_url: String,
    /// Original filename for uploads (empty becomes NULL)
    pub original_filename: String,
    /// Storage path (empty becomes NULL)
    pub storage_path: String,
    /// Initial ingestion status
    pub status: KnowledgeStatus,
}

/// Admin listing row: an asset plus its chat and owner context
#[derive(Debug, Clone)]
pub struct AdminKnowledgeRow {
    /// The asset
    pub asset: KnowledgeAsset,
    /// Display name of the owning chat
    pub chat_display_name: Option<String>,
    /// Email of the chat's owner
    pub owner_email: Option<String>,
}

/// Knowledge asset database operations
pub struct KnowledgeManager {
    pool: SqlitePool,
}

impl KnowledgeManager {
    /// Create a new manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new asset record and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn insert(&self, new: NewKnowledgeAsset) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO knowledge_assets
                (id, chat_id, type, title, source_url, original_filename, storage_path, status, created_at, updated_at)
            VALUES ($1, $2, $3, NULLIF($4, ''), NULLIF($5, ''), NULLIF($6, ''), NULLIF($7, ''), $8, $9, $9)
            ",
        )
        .bind(&id)
        .bind(&new.chat_id)
        .bind(new.kind.as_str())
        .bind(&new.title)
        .bind(&new.source_url)
        .bind(&new.original_filename)
        .bind(&new.storage_path)
        .bind(new.status.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert knowledge asset: {e}")))?;

        Ok(id)
    }

    /// Update ingestion status. The storage path only changes when a
    /// non-empty value is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn set_status(
        &self,
        id: &str,
        status: KnowledgeStatus,
        error_message: &str,
        storage_path: &str,
    ) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"
            UPDATE knowledge_assets
            SET status = $1,
                error_message = NULLIF($2, ''),
                storage_path = COALESCE(NULLIF($3, ''), storage_path),
                updated_at = $4
            WHERE id = $5
            ",
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(storage_path)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update knowledge status: {e}")))?;
        Ok(())
    }

    /// Record the vector store point id assigned by the inference backend
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn set_vector_point(&self, id: &str, vector_point_id: &str) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"
            UPDATE knowledge_assets
            SET vector_point_id = $1, updated_at = $2
            WHERE id = $3
            ",
        )
        .bind(vector_point_id)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update vector point id: {e}")))?;
        Ok(())
    }

    /// Update the display title
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn set_title(&self, id: &str, title: &str) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"
            UPDATE knowledge_assets
            SET title = NULLIF($1, ''), updated_at = $2
            WHERE id = $3
            ",
        )
        .bind(title)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update knowledge title: {e}")))?;
        Ok(())
    }

    /// List assets belonging to an owner's chats, newest first, capped at
    /// 200 rows. An empty `chat_id` filter returns assets of every chat
    /// the owner has.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_for_owner(
        &self,
        owner_user_id: &str,
        chat_id: Option<&str>,
    ) -> AppResult<Vec<KnowledgeAsset>> {
        let base = r"
            SELECT ka.id, ka.chat_id, ka.type, ka.title, ka.source_url, ka.original_filename,
                   ka.storage_path, ka.status, ka.embedding_count, ka.error_message,
                   ka.vector_point_id, ka.created_at, ka.updated_at
            FROM knowledge_assets ka
            JOIN chat_profiles cp ON cp.id = ka.chat_id
            WHERE cp.owner_user_id = $1";

        let rows = match chat_id.filter(|c| !c.trim().is_empty()) {
            Some(chat) => {
                sqlx::query(&format!(
                    "{base} AND ka.chat_id = $2 ORDER BY ka.created_at DESC LIMIT 200"
                ))
                .bind(owner_user_id)
                .bind(chat)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("{base} ORDER BY ka.created_at DESC LIMIT 200"))
                    .bind(owner_user_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to list knowledge assets: {e}")))?;

        Ok(rows.iter().map(map_asset_row).collect())
    }

    /// Fetch an asset, only when its chat belongs to `owner_user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_owned(
        &self,
        id: &str,
        owner_user_id: &str,
    ) -> AppResult<Option<KnowledgeAsset>> {
        let row = sqlx::query(
            r"
            SELECT ka.id, ka.chat_id, ka.type, ka.title, ka.source_url, ka.original_filename,
                   ka.storage_path, ka.status, ka.embedding_count, ka.error_message,
                   ka.vector_point_id, ka.created_at, ka.updated_at
            FROM knowledge_assets ka
            JOIN chat_profiles cp ON cp.id = ka.chat_id
            WHERE ka.id = $1 AND cp.owner_user_id = $2
            ",
        )
        .bind(id)
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get knowledge asset: {e}")))?;

        Ok(row.as_ref().map(map_asset_row))
    }

    /// Delete an asset record. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM knowledge_assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete knowledge asset: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Total number of assets (admin stats)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM knowledge_assets")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count knowledge assets: {e}")))?;
        Ok(row.get("count"))
    }

    /// Admin listing with chat and owner context, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_all_paged(
        &self,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<AdminKnowledgeRow>> {
        let rows = sqlx::query(
            r"
            SELECT ka.id, ka.chat_id, ka.type, ka.title, ka.source_url, ka.original_filename,
                   ka.storage_path, ka.status, ka.embedding_count, ka.error_message,
                   ka.vector_point_id, ka.created_at, ka.updated_at,
                   cp.display_name AS chat_display_name,
                   u.email AS owner_email
            FROM knowledge_assets ka
            LEFT JOIN chat_profiles cp ON cp.id = ka.chat_id
            LEFT JOIN users u ON u.id = cp.owner_user_id
            ORDER BY ka.created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list knowledge assets: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| AdminKnowledgeRow {
                asset: map_asset_row(r),
                chat_display_name: r.get("chat_display_name"),
                owner_email: r.get("owner_email"),
            })
            .collect())
    }
}

fn map_asset_row(row: &sqlx::sqlite::SqliteRow) -> KnowledgeAsset {
    let kind: String = row.get("type");
    let status: String = row.get("status");
    KnowledgeAsset {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        kind: KnowledgeKind::from_raw(&kind),
        title: row.get("title"),
        source_url: row.get("source_url"),
        original_filename: row.get("original_filename"),
        storage_path: row.get("storage_path"),
        status: KnowledgeStatus::from_raw(&status),
        embedding_count: row.get("embedding_count"),
        error_message: row.get("error_message"),
        vector_point_id: row.get("vector_point_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
