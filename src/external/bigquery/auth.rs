// ABOUTME: OAuth2 service-account JWT-bearer flow built from primitives
// ABOUTME: RS256 signing over PKCS#8 key material with expiry-aware token caching
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Service-account authentication
//!
//! Server-to-server Google API auth without an interactive login: a JWT is
//! self-signed with the service account's RSA key and exchanged for a
//! bearer access token. The token is cached and reused until 60 seconds
//! before expiry; a stale cache triggers exactly one re-sign and
//! re-exchange.
//!
//! Every failure path - unparsable key, bad signature, rejected exchange,
//! network fault - logs and yields "no token". Callers treat that as
//! "analytics unavailable", never as a request-fatal error.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::{Digest, Sha256};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, warn};

use super::DEFAULT_TOKEN_URL;
use crate::errors::{AppError, AppResult};

const GRANT_TYPE_JWT_BEARER: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Reuse margin: a cached token is considered stale 60s before expiry
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Assertion lifetime claimed in the self-signed JWT
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service account key material, deserialized from the JSON key file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Google Cloud project
    pub project_id: String,
    /// Key id (unused by the flow, kept for diagnostics)
    #[serde(default)]
    pub private_key_id: String,
    /// PEM-encoded PKCS#8 RSA private key
    pub private_key: String,
    /// Service account email, used as the JWT issuer
    pub client_email: String,
}

impl ServiceAccountKey {
    /// Parse the key file content. Parse failures log and yield `None` so
    /// that a bad key degrades to the disabled state instead of failing
    /// startup.
    #[must_use]
    pub fn from_json(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                error!(error = %e, "failed to parse service account key JSON");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expiry_ms: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Exchanges self-signed JWTs for bearer tokens, caching the result.
///
/// One provider instance owns one cached token; the cache is mutex-guarded
/// because request handling is multi-threaded. Holding the lock across the
/// refresh keeps concurrent callers from racing duplicate exchanges.
pub struct GoogleTokenProvider {
    credentials: Option<ServiceAccountKey>,
    scope: String,
    token_url: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleTokenProvider {
    /// Create a provider for one scope. `credentials: None` produces a
    /// permanently disabled provider.
    #[must_use]
    pub fn new(credentials: Option<ServiceAccountKey>, scope: impl Into<String>) -> Self {
        Self {
            credentials,
            scope: scope.into(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Override the token endpoint (tests)
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Whether credentials were loaded
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Get a bearer token, reusing the cache while
    /// `now < expiry - 60s`. `None` means the subsystem is unavailable
    /// for this call: no credentials, or the exchange failed.
    pub async fn token(&self) -> Option<String> {
        let credentials = self.credentials.as_ref()?;

        let mut cached = self.cached.lock().await;
        let now_ms = Utc::now().timestamp_millis();
        if let Some(c) = cached.as_ref() {
            if now_ms < c.expiry_ms - EXPIRY_MARGIN_MS {
                return Some(c.token.clone());
            }
        }

        let assertion = match generate_jwt(credentials, &self.scope, &self.token_url) {
            Ok(jwt) => jwt,
            Err(e) => {
                error!(error = %e, "failed to sign service account assertion");
                return None;
            }
        };

        let response = match self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", GRANT_TYPE_JWT_BEARER),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "OAuth token request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body, "OAuth token request rejected");
            return None;
        }

        let token_response = match response.json::<TokenResponse>().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "OAuth token response unparsable");
                return None;
            }
        };

        let token = token_response.access_token;
        *cached = Some(CachedToken {
            token: token.clone(),
            expiry_ms: now_ms + token_response.expires_in * 1000,
        });
        Some(token)
    }
}

/// Build and sign the JWT-bearer assertion
fn generate_jwt(key: &ServiceAccountKey, scope: &str, audience: &str) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
    let claims = serde_json::json!({
        "iss": key.client_email,
        "scope": scope,
        "aud": audience,
        "iat": now,
        "exp": now + ASSERTION_LIFETIME_SECS,
    });

    let signing_input = format!(
        "{}.{}",
        base64url(header.to_string().as_bytes()),
        base64url(claims.to_string().as_bytes())
    );
    let signature = sign_rs256(&signing_input, &key.private_key)?;
    Ok(format!("{signing_input}.{}", base64url(&signature)))
}

/// RSASSA-PKCS1-v1_5/SHA-256 over the UTF-8 signing input.
///
/// The PEM armor is stripped by hand and the body base64-decoded to raw
/// PKCS#8 bytes; the runtime offers no OS-level crypto binding, only the
/// asymmetric-signing primitive.
fn sign_rs256(signing_input: &str, private_key_pem: &str) -> AppResult<Vec<u8>> {
    let body: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = STANDARD
        .decode(body.trim())
        .map_err(|e| AppError::config(format!("service account key is not valid base64: {e}")))?;
    let key = RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|e| AppError::config(format!("service account key is not valid PKCS#8: {e}")))?;

    let digest = Sha256::digest(signing_input.as_bytes());
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| AppError::internal(format!("RS256 signing failed: {e}")))
}

fn base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
