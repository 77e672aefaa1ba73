// ABOUTME: Database operations for operator accounts
// ABOUTME: Upsert-on-authentication plus admin listings with chat counts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::{AppError, AppResult};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// An operator account row, with chat count in admin listings
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserAccount {
    /// Identity provider user id
    pub id: String,
    /// Account email
    pub email: String,
    /// Whether the email is verified
    pub email_verified: bool,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
    /// Number of chat profiles the account owns
    pub chat_count: i64,
}

/// Operator account database operations
pub struct UsersManager {
    pool: SqlitePool,
}

impl UsersManager {
    /// Create a new manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh an account row from a verified ID token
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert(&self, id: &str, email: &str, email_verified: bool) -> AppResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r"
            INSERT INTO users (id, email, email_verified, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                email_verified = excluded.email_verified,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id)
        .bind(email)
        .bind(i64::from(email_verified))
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert user: {e}")))?;
        Ok(())
    }

    /// Total number of accounts (admin stats)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {e}")))?;
        Ok(row.get("count"))
    }

    /// Admin listing with per-account chat counts, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_paged(&self, limit: i64, offset: i64) -> AppResult<Vec<UserAccount>> {
        let rows = sqlx::query(
            r"
            SELECT u.id, u.email, u.email_verified, u.created_at, u.updated_at,
                   COUNT(DISTINCT cp.id) AS chat_count
            FROM users u
            LEFT JOIN chat_profiles cp ON cp.owner_user_id = u.id
            GROUP BY u.id, u.email, u.email_verified, u.created_at, u.updated_at
            ORDER BY u.created_at DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list users: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| UserAccount {
                id: r.get("id"),
                email: r.get("email"),
                email_verified: r.get::<i64, _>("email_verified") == 1,
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
                chat_count: r.get("chat_count"),
            })
            .collect())
    }
}
