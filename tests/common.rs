// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory database, stub verifier, mock servers, and request helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use embedchat_server::auth::{AuthUser, TokenVerifier};
use embedchat_server::config::ServerConfig;
use embedchat_server::database::{Database, NewChatProfile};
use embedchat_server::errors::AppResult;
use embedchat_server::models::TargetKind;
use embedchat_server::resources::ServerResources;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

/// Bearer token accepted for the first test operator
pub const TOKEN_ALICE: &str = "token-alice";
/// Bearer token accepted for the second test operator
pub const TOKEN_BOB: &str = "token-bob";
/// Bearer token for an operator without a verified email
pub const TOKEN_UNVERIFIED: &str = "token-carol";

pub const ADMIN_KEY: &str = "test-admin-key";

/// Verifier that maps fixed tokens to fixed identities
pub struct StaticVerifier {
    users: HashMap<String, AuthUser>,
}

impl StaticVerifier {
    pub fn with_default_users() -> Self {
        let mut users = HashMap::new();
        users.insert(
            TOKEN_ALICE.to_owned(),
            AuthUser {
                id: "user-alice".to_owned(),
                email: "alice@example.com".to_owned(),
                email_verified: true,
            },
        );
        users.insert(
            TOKEN_BOB.to_owned(),
            AuthUser {
                id: "user-bob".to_owned(),
                email: "bob@example.com".to_owned(),
                email_verified: true,
            },
        );
        users.insert(
            TOKEN_UNVERIFIED.to_owned(),
            AuthUser {
                id: "user-carol".to_owned(),
                email: "carol@example.com".to_owned(),
                email_verified: false,
            },
        );
        Self { users }
    }
}

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<Option<AuthUser>> {
        Ok(self.users.get(id_token).cloned())
    }
}

/// Configuration with analytics disabled and a known admin key
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".to_owned(),
        admin_api_key: Some(ADMIN_KEY.to_owned()),
        inference_base_url: "http://127.0.0.1:1".to_owned(),
        inference_timeout_secs: 5,
        max_upload_bytes: 5 * 1024 * 1024,
        allowed_origins: vec!["*".to_owned()],
        google_project_id: None,
        bigquery_dataset: "ai_chat_logs".to_owned(),
        audit_table: "management_audit_logs".to_owned(),
        service_account_key: None,
        identity_project_id: Some("test-project".to_owned()),
    }
}

/// Fresh in-memory database with migrations applied
pub async fn test_database() -> Database {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let database = Database::from_pool(pool);
    database.migrate().await.unwrap();
    database
}

/// Full resource container over an in-memory database
pub async fn test_resources() -> Arc<ServerResources> {
    test_resources_with_config(test_config()).await
}

pub async fn test_resources_with_config(config: ServerConfig) -> Arc<ServerResources> {
    let database = test_database().await;
    let verifier = Arc::new(StaticVerifier::with_default_users());
    Arc::new(ServerResources::new(config, database, verifier))
}

/// Insert a chat profile directly through the manager
pub async fn seed_profile(
    database: &Database,
    id: &str,
    targets: &[&str],
    owner: &str,
) -> AppResult<()> {
    database
        .chats()
        .create(NewChatProfile {
            id: id.to_owned(),
            targets: targets.iter().map(|t| (*t).to_owned()).collect(),
            target_type: TargetKind::Web,
            display_name: format!("{id} chat"),
            system_prompt: String::new(),
            owner_user_id: owner.to_owned(),
        })
        .await
        .map(|_| ())
}

/// Serve a router on an ephemeral local port, returning its address
pub async fn spawn_app(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// PEM-encoded PKCS#8 RSA key shared by the JWT-bearer tests.
/// Key generation is slow, so it happens once per test binary.
pub fn test_private_key_pem() -> &'static str {
    static KEY: OnceLock<String> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
    })
}

/// Service account key JSON wrapping the shared test RSA key
pub fn service_account_json() -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "test-project",
        "private_key_id": "test-key-id",
        "private_key": test_private_key_pem(),
        "client_email": "warehouse@test-project.iam.gserviceaccount.com",
        "client_id": "1234567890",
    })
    .to_string()
}

/// JSON request with an optional bearer token
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
