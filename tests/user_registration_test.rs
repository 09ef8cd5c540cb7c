// ABOUTME: Integration tests for user registration and TOTP enrollment
// ABOUTME: Exercises the one-shot seed disclosure, verification, and its failure modes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use mealtime_server::auth::totp;
use mealtime_server::config::{LogFormat, ServerConfig};
use mealtime_server::database_plugins::factory::Database;
use mealtime_server::database_plugins::DatabaseProvider;
use mealtime_server::events::NoopPublisher;
use mealtime_server::models::{new_id, HouseholdInvitation};
use mealtime_server::resources::ServerResources;
use mealtime_server::routes::build_router;

const STRONG_PASSWORD: &str = "correct-horse-battery-staple-42";

fn test_config(signups_enabled: bool) -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "memory:".to_owned(),
        cookie_signing_key: "a".repeat(64),
        signups_enabled,
        min_username_length: 3,
        min_password_length: 8,
        minimum_password_entropy: 75.0,
        token_lifetime_seconds: 3600,
        cookie_lifetime_seconds: 3600,
        log_format: LogFormat::Pretty,
    }
}

async fn test_app(signups_enabled: bool) -> (Router, Arc<ServerResources>) {
    let database = Database::new("memory:").await.unwrap();
    let resources = Arc::new(ServerResources::new(
        database,
        Arc::new(NoopPublisher),
        test_config(signups_enabled),
    ));
    (build_router(Arc::clone(&resources)), resources)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/",
            &json!({
                "username": username,
                "email_address": format!("{username}@example.test"),
                "password": STRONG_PASSWORD,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn test_registration_discloses_seed_and_qr_once() {
    let (app, _) = test_app(true).await;

    let body = register(&app, "ada").await;

    let seed = body["two_factor_secret"].as_str().unwrap();
    // 64 random octets pad out to 104 base32 characters
    assert_eq!(seed.len(), 104);

    let qr = body["two_factor_qr_code"].as_str().unwrap();
    assert!(qr.starts_with("data:image/jpeg;base64,"));

    assert!(!body["created_user_id"].as_str().unwrap().is_empty());
    assert_eq!(body["username"], "ada");
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let (app, _) = test_app(true).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/",
            &json!({
                "username": "ada",
                "email_address": "ada@example.test",
                "password": "password1",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let (app, _) = test_app(true).await;
    register(&app, "ada").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/",
            &json!({
                "username": "ada",
                "email_address": "other@example.test",
                "password": STRONG_PASSWORD,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signups_can_be_disabled() {
    let (app, _) = test_app(false).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/",
            &json!({
                "username": "ada",
                "email_address": "ada@example.test",
                "password": STRONG_PASSWORD,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_invitation_is_not_found() {
    let (app, _) = test_app(true).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/",
            &json!({
                "username": "ada",
                "email_address": "ada@example.test",
                "password": STRONG_PASSWORD,
                "invitation_id": new_id(),
                "invitation_token": "nope",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invitation_places_user_in_destination_household() {
    let (app, resources) = test_app(true).await;

    let invitation = HouseholdInvitation {
        id: new_id(),
        token: "tok".to_owned(),
        destination_household: new_id(),
        created_at: Utc::now(),
    };
    let Database::Memory(db) = &resources.database else {
        panic!("test app uses the memory backend");
    };
    db.insert_household_invitation(invitation.clone()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/",
            &json!({
                "username": "ada",
                "email_address": "ada@example.test",
                "password": STRONG_PASSWORD,
                "invitation_id": invitation.id,
                "invitation_token": "tok",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;

    let user_id = body["created_user_id"].as_str().unwrap();
    let user = resources.database.get_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.default_household_id, invitation.destination_household);
}

#[tokio::test]
async fn test_totp_verification_flow() {
    let (app, _) = test_app(true).await;
    let body = register(&app, "ada").await;
    let user_id = body["created_user_id"].as_str().unwrap().to_owned();
    let seed = body["two_factor_secret"].as_str().unwrap().to_owned();

    // wrong code first
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/totp_secret/verify",
            &json!({ "user_id": user_id, "totp_token": "000000" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // right code verifies
    let code = totp::generate_code(&seed).unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/totp_secret/verify",
            &json!({ "user_id": user_id, "totp_token": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // replay reports the change was already applied
    let code = totp::generate_code(&seed).unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users/totp_secret/verify",
            &json!({ "user_id": user_id, "totp_token": code }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ALREADY_REPORTED);
}

#[tokio::test]
async fn test_totp_verification_for_unknown_user() {
    let (app, _) = test_app(true).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/users/totp_secret/verify",
            &json!({ "user_id": new_id(), "totp_token": "123456" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
