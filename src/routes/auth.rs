// ABOUTME: Login and logout endpoints
// ABOUTME: Login mints the signed session cookie; logout replaces it with an expired one
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::database_plugins::DatabaseProvider;
use crate::errors::AppError;
use crate::events::{DataChangeEventType, DataChangeMessage};
use crate::models::UserLoginInput;
use crate::resources::ServerResources;
use crate::routes::session_context;

pub struct AuthRoutes;

impl AuthRoutes {
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/users/login", post(Self::login))
            .route("/users/logout", post(Self::logout))
            .with_state(resources)
    }

    /// `POST /users/login`.
    ///
    /// 202 with a session cookie on success; 401 for any credential
    /// mismatch (including unknown usernames, which are indistinguishable);
    /// 205 when the account requires a TOTP code and none was sent.
    async fn login(
        State(resources): State<Arc<ServerResources>>,
        jar: CookieJar,
        Json(input): Json<UserLoginInput>,
    ) -> Result<Response, AppError> {
        let user = resources
            .database
            .get_user_by_username(input.username.trim())
            .await?
            .ok_or_else(|| AppError::auth_invalid("invalid credentials"))?;

        let totp_token = input.totp_token.unwrap_or_default();
        let totp_required = user.two_factor_secret_verified_at.is_some();
        if totp_required && totp_token.is_empty() {
            // The client has the right username and should re-prompt for a code
            return Ok(StatusCode::RESET_CONTENT.into_response());
        }

        let seed = if totp_required {
            user.two_factor_secret.as_str()
        } else {
            ""
        };
        let valid = resources
            .authenticator
            .credentials_are_valid(&user.hashed_password, &input.password, seed, &totp_token)
            .map_err(|e| {
                AppError::internal("credentials could not be validated").with_source(e)
            })?;
        if !valid {
            return Err(AppError::auth_invalid("invalid credentials"));
        }

        let cookie = resources.session.issue_cookie(&user)?;

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::UserLoggedIn).with_user(&user.id),
        );
        tracing::info!(user_id = %user.id, "user logged in");

        let body = Json(json!({ "user_id": user.id }));
        Ok((StatusCode::ACCEPTED, jar.add(cookie), body).into_response())
    }

    /// `POST /users/logout`: always 202, cookie or not.
    async fn logout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
    ) -> Result<Response, AppError> {
        // Best effort: announce the logout when the cookie still resolves
        if let Ok(context) = session_context(&resources, &headers, &jar, &uri).await {
            resources.events.publish(
                DataChangeMessage::new(DataChangeEventType::UserLoggedOut)
                    .with_user(&context.requester.user_id),
            );
        }

        let jar = jar.add(resources.session.expired_cookie());
        Ok((jar, StatusCode::ACCEPTED).into_response())
    }
}
