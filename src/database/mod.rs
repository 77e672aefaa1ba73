// ABOUTME: Core database management with in-code migrations for SQLite
// ABOUTME: Wraps the connection pool and exposes per-table manager structs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

/// Chat profile and domain target storage
pub mod chats;
/// Knowledge asset storage and status tracking
pub mod knowledge;
/// Operator account storage and admin listings
pub mod users;
/// Widget UI settings and suggestion storage
pub mod widget_settings;

pub use chats::{AdminChatRow, ChatProfilesManager, NewChatProfile, UpdateChatProfile};
pub use knowledge::{AdminKnowledgeRow, KnowledgeManager, NewKnowledgeAsset};
pub use users::{UserAccount, UsersManager};
pub use widget_settings::{SuggestionInput, WidgetSettingsManager};

use crate::errors::{AppError, AppResult};
use sqlx::SqlitePool;
use tracing::info;

/// Database connection pool with schema management
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or a
    /// migration statement fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        info!("database ready at {database_url}");
        Ok(db)
    }

    /// Wrap an existing pool (tests create in-memory pools directly)
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run idempotent schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        }
        Ok(())
    }

    /// Chat profile operations
    #[must_use]
    pub fn chats(&self) -> ChatProfilesManager {
        ChatProfilesManager::new(self.pool.clone())
    }

    /// Knowledge asset operations
    #[must_use]
    pub fn knowledge(&self) -> KnowledgeManager {
        KnowledgeManager::new(self.pool.clone())
    }

    /// Operator account operations
    #[must_use]
    pub fn users(&self) -> UsersManager {
        UsersManager::new(self.pool.clone())
    }

    /// Widget settings and suggestion operations
    #[must_use]
    pub fn widget_settings(&self) -> WidgetSettingsManager {
        WidgetSettingsManager::new(self.pool.clone())
    }

    /// Underlying pool for health checks
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Detect a uniqueness violation by its storage-layer signature
#[must_use]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.to_string().to_lowercase().contains("unique")
}

/// Idempotent schema. Target uniqueness is enforced here: a duplicate
/// insert surfaces as a constraint error that the managers translate to a
/// conflict.
const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL DEFAULT '',
        email_verified INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS chat_profiles (
        id TEXT PRIMARY KEY,
        target TEXT NOT NULL,
        target_type TEXT NOT NULL DEFAULT 'web',
        display_name TEXT NOT NULL DEFAULT '',
        system_prompt TEXT NOT NULL DEFAULT '',
        owner_user_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS chat_targets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id TEXT NOT NULL REFERENCES chat_profiles(id) ON DELETE CASCADE,
        target TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_chat_targets_chat_id ON chat_targets(chat_id)",
    r"
    CREATE TABLE IF NOT EXISTS knowledge_assets (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL REFERENCES chat_profiles(id) ON DELETE CASCADE,
        type TEXT NOT NULL,
        title TEXT,
        source_url TEXT,
        original_filename TEXT,
        storage_path TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        embedding_count INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        vector_point_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_knowledge_assets_chat_id ON knowledge_assets(chat_id)",
    r"
    CREATE TABLE IF NOT EXISTS chat_ui_settings (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL UNIQUE REFERENCES chat_profiles(id) ON DELETE CASCADE,
        theme_settings TEXT NOT NULL DEFAULT '{}',
        widget_settings TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS chat_suggestions (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL REFERENCES chat_profiles(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        order_index INTEGER NOT NULL DEFAULT 0,
        enabled INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_chat_suggestions_chat_id ON chat_suggestions(chat_id)",
];
