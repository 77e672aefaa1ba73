// ABOUTME: Database operations for chat profiles and their domain targets
// ABOUTME: Two-tier target lookups with ownership-scoped variants for tenant isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::database::is_unique_violation;
use crate::errors::{AppError, AppResult};
use crate::models::{ChatProfile, TargetKind};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// Payload for registering a new chat profile.
///
/// `targets` must already be normalized and non-empty; the first entry is
/// mirrored onto the legacy single-value column.
#[derive(Debug, Clone)]
pub struct NewChatProfile {
    /// Tenant alias (sanitized)
    pub id: String,
    /// Canonicalized targets, first-seen order, at least one entry
    pub targets: Vec<String>,
    /// Channel type
    pub target_type: TargetKind,
    /// Display name
    pub display_name: String,
    /// System prompt
    pub system_prompt: String,
    /// Owning operator account
    pub owner_user_id: String,
}

/// Partial update for a chat profile. `None` fields are left untouched;
/// `targets`, when present, replaces the full target set.
#[derive(Debug, Clone, Default)]
pub struct UpdateChatProfile {
    /// New channel type
    pub target_type: Option<TargetKind>,
    /// Replacement target set (normalized, non-empty)
    pub targets: Option<Vec<String>>,
    /// New display name
    pub display_name: Option<String>,
    /// New system prompt
    pub system_prompt: Option<String>,
}

/// Admin listing row: a profile plus its owner's email
#[derive(Debug, Clone)]
pub struct AdminChatRow {
    /// The profile
    pub profile: ChatProfile,
    /// Owner email when the account row still exists
    pub owner_email: Option<String>,
}

const PROFILE_COLUMNS: &str = "cp.id, cp.target, cp.target_type, cp.display_name, \
     cp.system_prompt, cp.owner_user_id, cp.created_at, cp.updated_at, \
     GROUP_CONCAT(ct.target) AS targets";

const PROFILE_GROUP_BY: &str = "GROUP BY cp.id, cp.target, cp.target_type, cp.display_name, \
     cp.system_prompt, cp.owner_user_id, cp.created_at, cp.updated_at";

/// Chat profile database operations
pub struct ChatProfilesManager {
    pool: SqlitePool,
}

impl ChatProfilesManager {
    /// Create a new manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a chat profile with its target set.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when the id or any target already exists,
    /// or a database error on other storage faults.
    pub async fn create(&self, new: NewChatProfile) -> AppResult<ChatProfile> {
        let now = Utc::now().to_rfc3339();
        let first_target = new
            .targets
            .first()
            .ok_or_else(|| AppError::invalid_input("at least one target is required"))?
            .clone();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO chat_profiles (id, target, target_type, display_name, system_prompt, owner_user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ",
        )
        .bind(&new.id)
        .bind(&first_target)
        .bind(new.target_type.as_str())
        .bind(&new.display_name)
        .bind(&new.system_prompt)
        .bind(&new.owner_user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        for target in &new.targets {
            sqlx::query(
                r"
                INSERT INTO chat_targets (chat_id, target, created_at)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(&new.id)
            .bind(target)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(map_insert_error)?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit profile: {e}")))?;

        self.get(&new.id)
            .await?
            .ok_or_else(|| AppError::database("Profile vanished after insert"))
    }

    /// List profiles, optionally restricted to one owner
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list(&self, owner_user_id: Option<&str>) -> AppResult<Vec<ChatProfile>> {
        let rows = if let Some(owner) = owner_user_id {
            sqlx::query(&format!(
                "SELECT {PROFILE_COLUMNS}
                 FROM chat_profiles cp
                 LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
                 WHERE cp.owner_user_id = $1
                 {PROFILE_GROUP_BY}
                 ORDER BY cp.created_at ASC"
            ))
            .bind(owner)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(&format!(
                "SELECT {PROFILE_COLUMNS}
                 FROM chat_profiles cp
                 LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
                 {PROFILE_GROUP_BY}
                 ORDER BY cp.created_at ASC"
            ))
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::database(format!("Failed to list profiles: {e}")))?;

        Ok(rows.iter().map(map_profile_row).collect())
    }

    /// Fetch a profile by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get(&self, id: &str) -> AppResult<Option<ChatProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}
             FROM chat_profiles cp
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             WHERE cp.id = $1
             {PROFILE_GROUP_BY}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile: {e}")))?;

        Ok(row.as_ref().map(map_profile_row))
    }

    /// Fetch a profile by id, only when owned by `owner_user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_owned(&self, id: &str, owner_user_id: &str) -> AppResult<Option<ChatProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}
             FROM chat_profiles cp
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             WHERE cp.id = $1 AND cp.owner_user_id = $2
             {PROFILE_GROUP_BY}"
        ))
        .bind(id)
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile: {e}")))?;

        Ok(row.as_ref().map(map_profile_row))
    }

    /// Tier-1 lookup: find the profile owning a row in the target table
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_by_target(&self, target: &str) -> AppResult<Option<ChatProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}
             FROM chat_targets t
             JOIN chat_profiles cp ON cp.id = t.chat_id
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             WHERE t.target = $1
             {PROFILE_GROUP_BY}"
        ))
        .bind(target)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile by target: {e}")))?;

        Ok(row.as_ref().map(map_profile_row))
    }

    /// Tier-1 lookup restricted to one owner
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_by_target_owned(
        &self,
        target: &str,
        owner_user_id: &str,
    ) -> AppResult<Option<ChatProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}
             FROM chat_targets t
             JOIN chat_profiles cp ON cp.id = t.chat_id
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             WHERE t.target = $1 AND cp.owner_user_id = $2
             {PROFILE_GROUP_BY}"
        ))
        .bind(target)
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile by target: {e}")))?;

        Ok(row.as_ref().map(map_profile_row))
    }

    /// Tier-2 lookup: match the legacy single-value target column
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_by_legacy_target(&self, target: &str) -> AppResult<Option<ChatProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}
             FROM chat_profiles cp
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             WHERE cp.target = $1
             {PROFILE_GROUP_BY}"
        ))
        .bind(target)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile by legacy target: {e}")))?;

        Ok(row.as_ref().map(map_profile_row))
    }

    /// Tier-2 lookup restricted to one owner
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_by_legacy_target_owned(
        &self,
        target: &str,
        owner_user_id: &str,
    ) -> AppResult<Option<ChatProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}
             FROM chat_profiles cp
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             WHERE cp.target = $1 AND cp.owner_user_id = $2
             {PROFILE_GROUP_BY}"
        ))
        .bind(target)
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get profile by legacy target: {e}")))?;

        Ok(row.as_ref().map(map_profile_row))
    }

    /// Apply a partial update to an owned profile. `Ok(None)` when the
    /// profile does not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when a replacement target collides, or a
    /// database error on other storage faults.
    pub async fn update(
        &self,
        id: &str,
        owner_user_id: &str,
        changes: UpdateChatProfile,
    ) -> AppResult<Option<ChatProfile>> {
        let Some(current) = self.get_owned(id, owner_user_id).await? else {
            return Ok(None);
        };

        if let Some(targets) = &changes.targets {
            if targets.is_empty() {
                return Err(AppError::invalid_input("at least one target is required"));
            }
        }

        let next_type = changes.target_type.unwrap_or(current.target_type);
        let next_display = changes.display_name.unwrap_or(current.display_name);
        let next_prompt = changes.system_prompt.unwrap_or(current.system_prompt);
        let next_primary = changes
            .targets
            .as_ref()
            .and_then(|t| t.first().cloned())
            .unwrap_or(current.target);
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            UPDATE chat_profiles
            SET target = $1, target_type = $2, display_name = $3, system_prompt = $4, updated_at = $5
            WHERE id = $6 AND owner_user_id = $7
            ",
        )
        .bind(&next_primary)
        .bind(next_type.as_str())
        .bind(&next_display)
        .bind(&next_prompt)
        .bind(&now)
        .bind(id)
        .bind(owner_user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update profile: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(targets) = changes.targets {
            self.replace_targets(id, &targets).await?;
        }

        self.get_owned(id, owner_user_id).await
    }

    /// Replace the full target set of a profile
    ///
    /// # Errors
    ///
    /// Returns a conflict error when a target collides with another
    /// profile, or a database error on other storage faults.
    pub async fn replace_targets(&self, chat_id: &str, targets: &[String]) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query("DELETE FROM chat_targets WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear targets: {e}")))?;

        for target in targets {
            sqlx::query(
                r"
                INSERT INTO chat_targets (chat_id, target, created_at)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(chat_id)
            .bind(target)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(map_insert_error)?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit targets: {e}")))
    }

    /// Delete an owned profile and everything hanging off it. Returns
    /// whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete(&self, id: &str, owner_user_id: &str) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let result = sqlx::query("DELETE FROM chat_profiles WHERE id = $1 AND owner_user_id = $2")
            .bind(id)
            .bind(owner_user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete profile: {e}")))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| AppError::database(format!("Failed to roll back: {e}")))?;
            return Ok(false);
        }

        // Explicit cascade: the pool does not enable foreign_keys pragma
        for table in [
            "chat_targets",
            "knowledge_assets",
            "chat_ui_settings",
            "chat_suggestions",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE chat_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::database(format!("Failed to cascade delete: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit delete: {e}")))?;
        Ok(true)
    }

    /// Total number of profiles (admin stats)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM chat_profiles")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count profiles: {e}")))?;
        Ok(row.get("count"))
    }

    /// Admin listing with owner emails, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_all_paged(&self, limit: i64, offset: i64) -> AppResult<Vec<AdminChatRow>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS}, u.email AS owner_email
             FROM chat_profiles cp
             LEFT JOIN chat_targets ct ON ct.chat_id = cp.id
             LEFT JOIN users u ON u.id = cp.owner_user_id
             {PROFILE_GROUP_BY}, u.email
             ORDER BY cp.created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list profiles: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| AdminChatRow {
                profile: map_profile_row(r),
                owner_email: r.get("owner_email"),
            })
            .collect())
    }
}

fn map_insert_error(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::conflict("id or target already exists")
    } else {
        AppError::database(format!("Failed to insert profile data: {err}"))
    }
}

fn map_profile_row(row: &sqlx::sqlite::SqliteRow) -> ChatProfile {
    let targets_raw: Option<String> = row.get("targets");
    let targets: Vec<String> = targets_raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    let target_type: String = row.get("target_type");
    ChatProfile {
        id: row.get("id"),
        target: row.get("target"),
        targets,
        target_type: TargetKind::from_raw(&target_type),
        display_name: row.get("display_name"),
        system_prompt: row.get("system_prompt"),
        owner_user_id: row.get("owner_user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
