// ABOUTME: Integration tests for the OAuth2 service-account JWT-bearer flow
// ABOUTME: Token caching boundary, assertion shape, RS256 signature, and failure degradation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::{extract::Form, extract::State, response::Json, routing::post, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::{service_account_json, spawn_app, test_private_key_pem};
use embedchat_server::external::bigquery::{GoogleTokenProvider, ServiceAccountKey, SCOPE_READONLY};
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::{Digest, Sha256};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct TokenEndpointState {
    exchanges: Arc<AtomicUsize>,
    assertions: Arc<Mutex<Vec<String>>>,
    expires_in: i64,
    fail: bool,
}

async fn token_endpoint(
    State(state): State<TokenEndpointState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, axum::http::StatusCode> {
    assert_eq!(
        form.get("grant_type").map(String::as_str),
        Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    );
    state
        .assertions
        .lock()
        .unwrap()
        .push(form.get("assertion").cloned().unwrap_or_default());

    if state.fail {
        return Err(axum::http::StatusCode::UNAUTHORIZED);
    }
    let n = state.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(Json(serde_json::json!({
        "access_token": format!("tok-{n}"),
        "expires_in": state.expires_in,
    })))
}

async fn provider_with_mock(expires_in: i64, fail: bool) -> (GoogleTokenProvider, TokenEndpointState) {
    let state = TokenEndpointState {
        exchanges: Arc::new(AtomicUsize::new(0)),
        assertions: Arc::new(Mutex::new(Vec::new())),
        expires_in,
        fail,
    };
    let router = Router::new()
        .route("/token", post(token_endpoint))
        .with_state(state.clone());
    let addr = spawn_app(router).await;

    let credentials = ServiceAccountKey::from_json(&service_account_json()).unwrap();
    let provider = GoogleTokenProvider::new(Some(credentials), SCOPE_READONLY)
        .with_token_url(format!("http://{addr}/token"));
    (provider, state)
}

#[tokio::test]
async fn token_is_reused_within_the_expiry_margin() {
    let (provider, state) = provider_with_mock(3600, false).await;

    let first = provider.token().await.unwrap();
    let second = provider.token().await.unwrap();

    assert_eq!(first, "tok-1");
    assert_eq!(second, "tok-1");
    assert_eq!(state.exchanges.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_token_triggers_exactly_one_new_exchange() {
    // expires_in of 60s lands exactly on the safety margin, so the cached
    // token is already stale on the next call
    let (provider, state) = provider_with_mock(60, false).await;

    let first = provider.token().await.unwrap();
    let second = provider.token().await.unwrap();

    assert_eq!(first, "tok-1");
    assert_eq!(second, "tok-2");
    assert_eq!(state.exchanges.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn assertion_is_a_well_formed_signed_jwt() {
    let (provider, state) = provider_with_mock(3600, false).await;
    provider.token().await.unwrap();

    let assertions = state.assertions.lock().unwrap();
    let segments: Vec<&str> = assertions[0].split('.').collect();
    assert_eq!(segments.len(), 3);

    let header: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[0]).unwrap()).unwrap();
    assert_eq!(header["alg"], "RS256");
    assert_eq!(header["typ"], "JWT");

    let claims: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
    assert_eq!(
        claims["iss"],
        "warehouse@test-project.iam.gserviceaccount.com"
    );
    assert_eq!(claims["scope"], SCOPE_READONLY);
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        3600
    );

    // The signature must verify against the service account's public key
    let private = RsaPrivateKey::from_pkcs8_pem(test_private_key_pem()).unwrap();
    let public = RsaPublicKey::from(&private);
    let signing_input = format!("{}.{}", segments[0], segments[1]);
    let digest = Sha256::digest(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.decode(segments[2]).unwrap();
    public
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .expect("RS256 signature must verify");
}

#[tokio::test]
async fn rejected_exchange_yields_no_token() {
    let (provider, _state) = provider_with_mock(3600, true).await;
    assert!(provider.token().await.is_none());
    // A later call retries rather than caching the failure
    assert!(provider.token().await.is_none());
}

#[tokio::test]
async fn missing_credentials_disable_the_provider_without_network() {
    let provider = GoogleTokenProvider::new(None, SCOPE_READONLY)
        .with_token_url("http://127.0.0.1:1/token");
    assert!(!provider.is_enabled());
    assert!(provider.token().await.is_none());
}

#[tokio::test]
async fn unparsable_key_json_degrades_to_disabled() {
    assert!(ServiceAccountKey::from_json("{ not json").is_none());
}
