// ABOUTME: Operator authentication: ID-token verification and admin API key checks
// ABOUTME: Consumes the identity provider as a black box behind the TokenVerifier trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Authentication
//!
//! Operators sign in through the hosted identity provider; the server only
//! ever sees bearer ID tokens. [`GoogleIdTokenVerifier`] validates them as
//! RS256 JWTs against Google's published JWK set (cached for an hour) with
//! the identity project as audience. Server-to-server callers authenticate
//! with the admin API key instead, compared in constant time.

use crate::errors::AppResult;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::warn;

/// JWK set published for the hosted identity token signer
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A verified operator identity
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Identity provider user id
    pub id: String,
    /// Account email
    pub email: String,
    /// Whether the email is verified
    pub email_verified: bool,
}

/// Black-box ID-token verification. `Ok(None)` means the token was absent
/// or rejected; errors are reserved for unexpected faults.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer ID token
    async fn verify(&self, id_token: &str) -> AppResult<Option<AuthUser>>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: HashMap<String, (String, String)>,
}

/// Verifies identity-provider ID tokens against Google's JWK set
pub struct GoogleIdTokenVerifier {
    project_id: String,
    jwks_url: String,
    http: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl GoogleIdTokenVerifier {
    /// Create a verifier for one identity project. An empty project id
    /// rejects every token.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: DEFAULT_JWKS_URL.to_owned(),
            http: reqwest::Client::new(),
            cache: RwLock::new(None),
        }
    }

    /// Override the JWK endpoint (tests)
    #[must_use]
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    async fn signing_key(&self, kid: &str) -> Option<(String, String)> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < KEY_CACHE_TTL {
                    if let Some(key) = cached.keys.get(kid) {
                        return Some(key.clone());
                    }
                }
            }
        }

        // Miss or stale cache: refetch the key set once
        let set = match self.fetch_keys().await {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "failed to fetch identity signing keys");
                return None;
            }
        };
        let keys: HashMap<String, (String, String)> = set
            .keys
            .into_iter()
            .map(|k| (k.kid, (k.n, k.e)))
            .collect();
        let found = keys.get(kid).cloned();
        *self.cache.write().await = Some(CachedKeys {
            fetched_at: Instant::now(),
            keys,
        });
        found
    }

    async fn fetch_keys(&self) -> Result<JwkSet, reqwest::Error> {
        self.http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await
    }
}

#[async_trait]
impl TokenVerifier for GoogleIdTokenVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<Option<AuthUser>> {
        if self.project_id.is_empty() || id_token.is_empty() {
            return Ok(None);
        }

        let header = match decode_header(id_token) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "malformed ID token header");
                return Ok(None);
            }
        };
        let Some(kid) = header.kid else {
            warn!("ID token missing kid");
            return Ok(None);
        };
        let Some((n, e)) = self.signing_key(&kid).await else {
            warn!(kid, "no signing key for ID token");
            return Ok(None);
        };

        let key = match DecodingKey::from_rsa_components(&n, &e) {
            Ok(k) => k,
            Err(err) => {
                warn!(error = %err, "invalid identity signing key material");
                return Ok(None);
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);

        match decode::<IdTokenClaims>(id_token, &key, &validation) {
            Ok(data) => Ok(Some(AuthUser {
                id: data.claims.sub,
                email: data.claims.email.unwrap_or_default(),
                email_verified: data.claims.email_verified.unwrap_or(false),
            })),
            Err(e) => {
                warn!(error = %e, "ID token verification failed");
                Ok(None)
            }
        }
    }
}

/// Constant-time admin API key comparison. Hashing first makes the check
/// independent of input lengths.
#[must_use]
pub fn admin_key_matches(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || provided.is_empty() {
        return false;
    }
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(provided.as_bytes());
    a.ct_eq(&b).into()
}

/// Extract the token from a `Bearer` authorization header value
#[must_use]
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let lower = header_value.get(..7)?;
    if lower.eq_ignore_ascii_case("bearer ") {
        let token = header_value[7..].trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}
