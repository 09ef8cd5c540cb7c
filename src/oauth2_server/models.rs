// ABOUTME: OAuth2 wire types for the token endpoint and the issued-token record
// ABOUTME: Request, response, and RFC 6749 section 5.2 error body shapes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Form body of `POST /oauth2/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    /// Space-separated scope tokens; omitted means "everything granted to
    /// the client"
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    /// Space-separated scopes actually granted
    pub scope: String,
}

/// RFC 6749 section 5.2 error body.
///
/// The token endpoint speaks this instead of the application error shape;
/// OAuth2 clients parse it mechanically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Error {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl OAuth2Error {
    fn new(error: &str, description: &str, status: StatusCode) -> Self {
        Self {
            error: error.to_owned(),
            error_description: Some(description.to_owned()),
            status: status.as_u16(),
        }
    }

    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self::new("invalid_request", description, StatusCode::BAD_REQUEST)
    }

    /// Unknown client, archived client, or wrong secret; all three are
    /// indistinguishable to the caller
    #[must_use]
    pub fn invalid_client() -> Self {
        Self::new(
            "invalid_client",
            "client authentication failed",
            StatusCode::UNAUTHORIZED,
        )
    }

    #[must_use]
    pub fn invalid_scope(description: &str) -> Self {
        Self::new("invalid_scope", description, StatusCode::BAD_REQUEST)
    }

    /// The client exists and authenticated, but may not use this grant
    #[must_use]
    pub fn unauthorized_client() -> Self {
        Self::new(
            "unauthorized_client",
            "client is not authorized for this grant type",
            StatusCode::BAD_REQUEST,
        )
    }

    #[must_use]
    pub fn unsupported_grant_type(grant_type: &str) -> Self {
        Self::new(
            "unsupported_grant_type",
            &format!("grant type {grant_type:?} is not supported"),
            StatusCode::BAD_REQUEST,
        )
    }

    #[must_use]
    pub fn server_error() -> Self {
        Self::new(
            "server_error",
            "internal error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }
}

impl IntoResponse for OAuth2Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// An issued bearer token
#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    /// Public `client_id` of the client this token was issued to
    pub client_id: String,
    /// Scopes granted at issue time
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Whether this token carries the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
