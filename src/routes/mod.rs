// ABOUTME: HTTP route assembly
// ABOUTME: Merges the health, OAuth2, client-management, user, and auth routers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Uri};
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppResult;
use crate::models::SessionContextData;
use crate::resources::ServerResources;

pub mod auth;
pub mod health;
pub mod oauth2;
pub mod oauth2_clients;
pub mod users;

/// Assemble the full application router.
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(oauth2::OAuth2Routes::routes(Arc::clone(&resources)))
        .merge(oauth2_clients::OAuth2ClientRoutes::routes(Arc::clone(
            &resources,
        )))
        .merge(users::UserRoutes::routes(Arc::clone(&resources)))
        .merge(auth::AuthRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
}

/// Build the session context for a request from its headers and cookies.
pub(crate) async fn session_context(
    resources: &ServerResources,
    headers: &HeaderMap,
    jar: &CookieJar,
    uri: &Uri,
) -> AppResult<SessionContextData> {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    resources
        .session
        .session_context(authorization, jar, uri.path())
        .await
}
