// ABOUTME: Integration tests for the OAuth2 client management API
// ABOUTME: Creation shape, one-shot secret disclosure, listing, and archive idempotence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use mealtime_server::config::{LogFormat, ServerConfig};
use mealtime_server::database_plugins::factory::Database;
use mealtime_server::events::NoopPublisher;
use mealtime_server::resources::ServerResources;
use mealtime_server::routes::build_router;

const STRONG_PASSWORD: &str = "correct-horse-battery-staple-42";

fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "memory:".to_owned(),
        cookie_signing_key: "a".repeat(64),
        signups_enabled: true,
        min_username_length: 3,
        min_password_length: 8,
        minimum_password_entropy: 75.0,
        token_lifetime_seconds: 3600,
        cookie_lifetime_seconds: 3600,
        log_format: LogFormat::Pretty,
    }
}

async fn test_app() -> Router {
    let database = Database::new("memory:").await.unwrap();
    let resources = Arc::new(ServerResources::new(
        database,
        Arc::new(NoopPublisher),
        test_config(),
    ));
    build_router(resources)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
    builder.body(body).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and log them in; returns the session cookie.
async fn signed_in_user(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/",
            None,
            Some(&json!({
                "username": username,
                "email_address": format!("{username}@example.test"),
                "password": STRONG_PASSWORD,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/login",
            None,
            Some(&json!({ "username": username, "password": STRONG_PASSWORD })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned()
}

async fn create_client(app: &Router, cookie: &str, name: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/oauth2_clients/",
            Some(cookie),
            Some(&json!({ "name": name, "scopes": ["meal_plans"] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn test_creation_discloses_credentials_once() {
    let app = test_app().await;
    let cookie = signed_in_user(&app, "ada").await;

    let created = create_client(&app, &cookie, "meal planner cli").await;

    let client_id = created["client_id"].as_str().unwrap();
    let client_secret = created["client_secret"].as_str().unwrap();
    assert_eq!(client_id.len(), 32);
    assert_eq!(client_secret.len(), 32);
    assert!(client_id.chars().all(|c| c.is_ascii_hexdigit()));

    // the read endpoint never shows the secret again
    let id = created["id"].as_str().unwrap();
    let response = app
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/oauth2_clients/{id}"),
            Some(&cookie),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["client_id"], client_id);
    assert!(body.get("client_secret").is_none());
}

#[tokio::test]
async fn test_successive_credentials_are_unique() {
    let app = test_app().await;
    let cookie = signed_in_user(&app, "ada").await;

    let a = create_client(&app, &cookie, "first").await;
    let b = create_client(&app, &cookie, "second").await;
    assert_ne!(a["client_id"], b["client_id"]);
    assert_ne!(a["client_secret"], b["client_secret"]);
}

#[tokio::test]
async fn test_empty_list_is_ok_not_found() {
    let app = test_app().await;
    let cookie = signed_in_user(&app, "ada").await;

    let response = app
        .oneshot(json_request(
            "GET",
            "/api/v1/oauth2_clients/",
            Some(&cookie),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_count"], 0);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_archive_then_replay_is_not_found() {
    let app = test_app().await;
    let cookie = signed_in_user(&app, "ada").await;
    let created = create_client(&app, &cookie, "doomed").await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/v1/oauth2_clients/{id}");

    let response = app
        .clone()
        .oneshot(json_request("DELETE", &uri, Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request("GET", &uri, Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request("DELETE", &uri, Some(&cookie), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_clients_are_invisible() {
    let app = test_app().await;
    let ada = signed_in_user(&app, "ada").await;
    let grace = signed_in_user(&app, "grace").await;

    let created = create_client(&app, &ada, "adas client").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/api/v1/oauth2_clients/{id}"),
            Some(&grace),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request("GET", "/api/v1/oauth2_clients/", Some(&grace), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/oauth2_clients/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/oauth2_clients/",
            None,
            Some(&json!({ "name": "cli" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_scope_rejected() {
    let app = test_app().await;
    let cookie = signed_in_user(&app, "ada").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/oauth2_clients/",
            Some(&cookie),
            Some(&json!({ "name": "cli", "scopes": ["Meal Plans"] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
