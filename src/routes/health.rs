// ABOUTME: Liveness endpoint
// ABOUTME: GET /health reports that the process is serving
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

#[must_use]
pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
