// ABOUTME: HTTP-level tests for chat profile CRUD and widget settings routes
// ABOUTME: Auth guards, status mapping, ownership isolation, and payload normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use axum::http::StatusCode;
use common::{body_json, json_request, test_resources, ADMIN_KEY, TOKEN_ALICE, TOKEN_BOB, TOKEN_UNVERIFIED};
use embedchat_server::routes;
use tower::ServiceExt;

#[tokio::test]
async fn list_requires_credentials() {
    let app = routes::router(test_resources().await);
    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/chats", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unverified_email_is_forbidden() {
    let app = routes::router(test_resources().await);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_UNVERIFIED),
            Some(serde_json::json!({ "target": "x.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_normalizes_targets_and_returns_created() {
    let app = routes::router(test_resources().await);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({
                "targets": ["HTTPS://WWW.Acme.com/", "acme.com", "acme.io"],
                "display_name": "  Acme Support  ",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let chat = body_json(response).await;
    assert_eq!(chat["targets"], serde_json::json!(["acme.com", "acme.io"]));
    assert_eq!(chat["target"], "acme.com");
    assert_eq!(chat["target_type"], "web");
    assert_eq!(chat["display_name"], "Acme Support");
    assert!(chat["id"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn create_without_valid_targets_is_bad_request() {
    let app = routes::router(test_resources().await);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "targets": ["", "   "] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_target_is_a_conflict() {
    let app = routes::router(test_resources().await);
    let first = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "target": "shared.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_BOB),
            Some(serde_json::json!({ "target": "https://www.shared.com" })),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn ownership_isolation_over_http() {
    let app = routes::router(test_resources().await);
    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "target": "mine.com" })),
        ))
        .await
        .unwrap();
    let chat = body_json(created).await;
    let id = chat["id"].as_str().unwrap().to_owned();

    // Bob cannot see, update, or delete Alice's profile
    let get = app
        .clone()
        .oneshot(json_request("GET", &format!("/api/chats/{id}"), Some(TOKEN_BOB), None))
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::NOT_FOUND);

    let update = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/chats/{id}"),
            Some(TOKEN_BOB),
            Some(serde_json::json!({ "display_name": "hijack" })),
        ))
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::NOT_FOUND);

    let delete = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/chats/{id}"),
            Some(TOKEN_BOB),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);

    // Alice still can
    let get = app
        .clone()
        .oneshot(json_request("GET", &format!("/api/chats/{id}"), Some(TOKEN_ALICE), None))
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_key_lists_every_tenant() {
    let resources = test_resources().await;
    let app = routes::router(resources);
    for (token, target) in [(TOKEN_ALICE, "a.com"), (TOKEN_BOB, "b.com")] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/chats",
                Some(token),
                Some(serde_json::json!({ "target": target })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let mut request = json_request("GET", "/api/chats", None, None);
    request
        .headers_mut()
        .insert("x-admin-api-key", ADMIN_KEY.parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["chats"].as_array().unwrap().len(), 2);

    // Operators only see their own
    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/chats", Some(TOKEN_ALICE), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["chats"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_replaces_targets_and_reports_noop() {
    let app = routes::router(test_resources().await);
    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "targets": ["one.com", "two.com"] })),
        ))
        .await
        .unwrap();
    let id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let updated = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/chats/{id}"),
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "targets": ["https://Three.com"] })),
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let chat = body_json(updated).await;
    assert_eq!(chat["targets"], serde_json::json!(["three.com"]));

    let noop = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/chats/{id}"),
            Some(TOKEN_ALICE),
            Some(serde_json::json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(noop).await, serde_json::json!({ "updated": false }));

    let emptied = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/chats/{id}"),
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "targets": [""] })),
        ))
        .await
        .unwrap();
    assert_eq!(emptied.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_round_trip() {
    let app = routes::router(test_resources().await);
    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "target": "gone.com" })),
        ))
        .await
        .unwrap();
    let id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let deleted = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/chats/{id}"),
            Some(TOKEN_ALICE),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body_json(deleted).await, serde_json::json!({ "deleted": true }));

    let again = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/chats/{id}"),
            Some(TOKEN_ALICE),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ui_settings_default_then_round_trip() {
    let app = routes::router(test_resources().await);
    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "target": "themed.com" })),
        ))
        .await
        .unwrap();
    let id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let defaults = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/chats/{id}/ui-settings"),
            Some(TOKEN_ALICE),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(defaults.status(), StatusCode::OK);
    let body = body_json(defaults).await;
    assert!(body["theme_settings"]["colors"]["headerBackground"].is_string());
    assert_eq!(body["id"], "");

    let put = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/chats/{id}/ui-settings"),
            Some(TOKEN_ALICE),
            Some(serde_json::json!({
                "theme_settings": { "colors": { "accentColor": "#00ff00" } },
                "widget_settings": { "button": { "size": 72 } },
            })),
        ))
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::OK);
    let body = body_json(put).await;
    assert_eq!(body["theme_settings"]["colors"]["accentColor"], "#00ff00");
    assert_eq!(body["widget_settings"]["button"]["size"], 72);
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn suggestions_round_trip() {
    let app = routes::router(test_resources().await);
    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chats",
            Some(TOKEN_ALICE),
            Some(serde_json::json!({ "target": "suggest.com" })),
        ))
        .await
        .unwrap();
    let id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let put = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/chats/{id}/suggestions"),
            Some(TOKEN_ALICE),
            Some(serde_json::json!({
                "suggestions": [
                    { "text": "What are your hours?", "order_index": 0, "enabled": true },
                    { "text": "Where do you ship?", "order_index": 1, "enabled": false },
                ]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(put.status(), StatusCode::OK);

    let get = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/chats/{id}/suggestions"),
            Some(TOKEN_ALICE),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(get).await;
    let suggestions = body["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0]["text"], "What are your hours?");
    assert_eq!(suggestions[1]["enabled"], false);
}
