// ABOUTME: HTTP middleware: audit capture for mutating requests and widget CORS
// ABOUTME: Audit recording is fire-and-forget relative to the response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use crate::auth::bearer_token;
use crate::models::{AuditAction, AuditEvent};
use crate::resources::ServerResources;
use crate::security::audit::{extract_resource_id, extract_resource_type};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use std::time::Instant;

/// Widget paths reachable without an `Origin` header (health checks)
const PUBLIC_WIDGET_PATHS: [&str; 2] = ["/widget", "/widget/health"];

/// Capture an audit event for every authenticated mutating management
/// request after the handler has run.
///
/// The event is built from request metadata and handed to the recorder on
/// a detached task; the response is returned immediately.
pub async fn audit_middleware(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query_chat_id = query_param(request.uri().query(), "chat_id");
    let headers = request.headers().clone();

    let response = next.run(request).await;

    if !is_mutating(&method) || is_exempt_path(&path) || !resources.audit.is_enabled() {
        return response;
    }

    // Only authenticated requests are logged; the JWK cache makes the
    // second verification local work
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
    else {
        return response;
    };
    let Ok(Some(user)) = resources.verifier.verify(token).await else {
        return response;
    };

    let resource_id = extract_resource_id(&path);
    let mut event = AuditEvent::new(
        &user.id,
        &user.email,
        AuditAction::from_method(method.as_str()),
        extract_resource_type(&path),
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed().as_millis() as u64,
    );
    if let Some(chat_id) = query_chat_id.or_else(|| resource_id.clone()) {
        event = event.with_chat_id(chat_id);
    }
    if let Some(id) = resource_id {
        event = event.with_resource_id(id);
    }
    if let Some(ip) = client_ip(&headers) {
        event = event.with_client_ip(ip);
    }
    if let Some(ua) = header_str(&headers, header::USER_AGENT) {
        event = event.with_user_agent(ua);
    }

    resources.audit.record(event);
    response
}

/// Origin gate for the public widget API.
///
/// With the wildcard allowlist, an origin is allowed iff it resolves to a
/// registered chat profile - the target tables double as the CORS
/// registry - and origin-less requests are rejected outside health paths.
/// A static allowlist never blocks; it only decides which origins get CORS
/// headers reflected back.
pub async fn widget_cors(
    State(resources): State<Arc<ServerResources>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let origin = header_str(request.headers(), header::ORIGIN).unwrap_or_default();
    let wildcard = resources.config.allows_any_origin();

    // Wildcard mode turns the target tables into the CORS registry: only
    // origins that resolve to a registered profile may pass, and bare
    // requests without an Origin header are blocked outside health paths.
    // A static allowlist never blocks; it only controls response headers.
    if wildcard {
        if origin.is_empty() {
            if PUBLIC_WIDGET_PATHS.contains(&path.as_str()) {
                return next.run(request).await;
            }
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "Origin header is required" })),
            )
                .into_response();
        }
        let registered = match resources.resolver().resolve_profile(&origin).await {
            Ok(profile) => profile.is_some(),
            Err(e) => {
                tracing::error!(error = %e, "origin registration check failed");
                false
            }
        };
        if !registered {
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "Origin not allowed" })),
            )
                .into_response();
        }
    }

    let reflect_origin = !origin.is_empty()
        && (wildcard || resources.config.allowed_origins.iter().any(|o| o == &origin));

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if reflect_origin {
        let headers = response.headers_mut();
        if let Ok(value) = origin.parse() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            header::HeaderValue::from_static("GET,POST,OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            header::HeaderValue::from_static("Content-Type, Authorization, X-Requested-With"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            header::HeaderValue::from_static("true"),
        );
    }
    response
        .headers_mut()
        .insert(header::VARY, header::HeaderValue::from_static("Origin"));
    response
}

fn is_mutating(method: &Method) -> bool {
    matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
}

fn is_exempt_path(path: &str) -> bool {
    path == "/health" || path.starts_with("/api/auth/") || path.starts_with("/widget")
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    for name in ["cf-connecting-ip", "x-forwarded-for"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or(value).trim();
            if !first.is_empty() {
                return Some(first.to_owned());
            }
        }
    }
    None
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .filter(|v| !v.is_empty())
}
