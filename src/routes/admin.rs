// ABOUTME: Admin listing routes gated by the admin API key
// ABOUTME: Paginated users, chats, and knowledge listings plus overall stats
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::routes::require_admin;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    limit: Option<i64>,
}

struct Pagination {
    page: i64,
    limit: i64,
    offset: i64,
}

impl Pagination {
    fn from_query(query: &PageQuery) -> Self {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(50).clamp(1, 100);
        Self {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }

    fn response(&self, total: i64) -> serde_json::Value {
        serde_json::json!({
            "page": self.page,
            "limit": self.limit,
            "total": total,
            "totalPages": (total + self.limit - 1) / self.limit,
        })
    }
}

/// Admin routes handler
pub struct AdminRoutes;

impl AdminRoutes {
    /// Create all admin routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/admin/users", get(Self::users))
            .route("/api/admin/chats", get(Self::chats))
            .route("/api/admin/knowledge", get(Self::knowledge))
            .route("/api/admin/stats", get(Self::stats))
            .with_state(resources)
    }

    /// List all operator accounts with chat counts
    async fn users(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        require_admin(&resources, &headers)?;
        let pagination = Pagination::from_query(&query);
        let users_manager = resources.database.users();
        let total = users_manager.count().await?;
        let users = users_manager
            .list_paged(pagination.limit, pagination.offset)
            .await?;
        Ok(Json(serde_json::json!({
            "users": users,
            "pagination": pagination.response(total),
        })))
    }

    /// List all chat profiles with owner context, no ownership filter
    async fn chats(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        require_admin(&resources, &headers)?;
        let pagination = Pagination::from_query(&query);
        let chats_manager = resources.database.chats();
        let total = chats_manager.count().await?;
        let rows = chats_manager
            .list_all_paged(pagination.limit, pagination.offset)
            .await?;

        let chats: Vec<serde_json::Value> = rows
            .into_iter()
            .map(|row| {
                let mut value = serde_json::to_value(&row.profile).unwrap_or_default();
                value["owner_email"] = row
                    .owner_email
                    .map_or(serde_json::Value::Null, serde_json::Value::String);
                value
            })
            .collect();

        Ok(Json(serde_json::json!({
            "chats": chats,
            "pagination": pagination.response(total),
        })))
    }

    /// List all knowledge assets with chat and owner context
    async fn knowledge(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        require_admin(&resources, &headers)?;
        let pagination = Pagination::from_query(&query);
        let knowledge_manager = resources.database.knowledge();
        let total = knowledge_manager.count().await?;
        let rows = knowledge_manager
            .list_all_paged(pagination.limit, pagination.offset)
            .await?;

        let items: Vec<serde_json::Value> = rows
            .into_iter()
            .map(|row| {
                let mut value = serde_json::to_value(&row.asset).unwrap_or_default();
                value["chat_display_name"] = row
                    .chat_display_name
                    .map_or(serde_json::Value::Null, serde_json::Value::String);
                value["owner_email"] = row
                    .owner_email
                    .map_or(serde_json::Value::Null, serde_json::Value::String);
                value
            })
            .collect();

        Ok(Json(serde_json::json!({
            "items": items,
            "pagination": pagination.response(total),
        })))
    }

    /// Overall platform counts
    async fn stats(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, AppError> {
        require_admin(&resources, &headers)?;
        let users_count = resources.database.users().count().await?;
        let chats_count = resources.database.chats().count().await?;
        let knowledge_count = resources.database.knowledge().count().await?;
        Ok(Json(serde_json::json!({
            "users_count": users_count,
            "chats_count": chats_count,
            "knowledge_count": knowledge_count,
        })))
    }
}
