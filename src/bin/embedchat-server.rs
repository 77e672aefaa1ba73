// ABOUTME: Server binary: configuration, database migration, and HTTP serving
// ABOUTME: Structured logging via tracing with env-filter control
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use embedchat_server::auth::GoogleIdTokenVerifier;
use embedchat_server::config::ServerConfig;
use embedchat_server::database::Database;
use embedchat_server::resources::ServerResources;
use embedchat_server::routes;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let database = Database::new(&config.database_url).await?;

    let verifier = Arc::new(GoogleIdTokenVerifier::new(
        config.identity_project_id.clone().unwrap_or_default(),
    ));

    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(config, database, verifier));
    let app = routes::router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("embedchat-server listening on port {port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
}
