// ABOUTME: OAuth2 authorization engine
// ABOUTME: Client-credentials token issuance and bearer validation with scope enforcement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use chrono::{Duration, Utc};
use subtle::ConstantTimeEq;

use crate::crypto::SecretGenerator;
use crate::database_plugins::factory::Database;
use crate::database_plugins::DatabaseProvider;
use crate::errors::{AppError, AppResult};
use crate::models::OAuth2Client;
use crate::oauth2_server::models::{OAuth2Error, Token, TokenRequest, TokenResponse};
use crate::oauth2_server::scope::scope_from_path;
use crate::oauth2_server::token_store::TokenStore;

/// Access tokens are 32 random octets, hex-encoded
const ACCESS_TOKEN_OCTETS: usize = 32;

const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";
const IMPLICIT_GRANT: &str = "implicit";

/// The authorization engine: issues tokens and validates bearers.
pub struct AuthorizationServer {
    database: Database,
    token_store: Arc<TokenStore>,
    secrets: SecretGenerator,
    token_lifetime: Duration,
}

impl AuthorizationServer {
    #[must_use]
    pub fn new(
        database: Database,
        token_store: Arc<TokenStore>,
        secrets: SecretGenerator,
        token_lifetime_seconds: i64,
    ) -> Self {
        Self {
            database,
            token_store,
            secrets,
            token_lifetime: Duration::seconds(token_lifetime_seconds),
        }
    }

    /// Run the client-credentials grant for a token request.
    ///
    /// Unknown clients, archived clients, and wrong secrets all produce the
    /// identical `invalid_client` response; nothing in the reply reveals
    /// which failed.
    ///
    /// # Errors
    /// Returns an [`OAuth2Error`] per RFC 6749 section 5.2.
    pub async fn token(&self, request: &TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        // password and authorization_code (and anything unrecognized) are
        // not served here; implicit is gated per client below
        if !matches!(
            request.grant_type.as_str(),
            CLIENT_CREDENTIALS_GRANT | IMPLICIT_GRANT
        ) {
            tracing::debug!(grant_type = %request.grant_type, "rejected unsupported grant type");
            return Err(OAuth2Error::unsupported_grant_type(&request.grant_type));
        }

        let client = self
            .database
            .get_oauth2_client_by_client_id(&request.client_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "client lookup failed during token grant");
                OAuth2Error::server_error()
            })?
            .ok_or_else(OAuth2Error::invalid_client)?;

        let secret_matches: bool = client
            .client_secret
            .as_bytes()
            .ct_eq(request.client_secret.as_bytes())
            .into();
        if !secret_matches {
            tracing::debug!(client_id = %request.client_id, "client secret mismatch");
            return Err(OAuth2Error::invalid_client());
        }

        if request.grant_type == IMPLICIT_GRANT && !client.implicit_allowed {
            tracing::debug!(client_id = %request.client_id, "implicit grant not allowed for client");
            return Err(OAuth2Error::unauthorized_client());
        }

        let granted = self.resolve_scopes(&client, request.scope.as_deref())?;

        let access_token = self
            .secrets
            .hex_string(ACCESS_TOKEN_OCTETS)
            .map_err(|_| OAuth2Error::server_error())?;

        let token = Token {
            access_token: access_token.clone(),
            client_id: client.client_id.clone(),
            scopes: granted.clone(),
            expires_at: Utc::now() + self.token_lifetime,
        };
        self.token_store.save(token);

        tracing::info!(
            client_id = %client.client_id,
            scopes = %granted.join(" "),
            "issued access token"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_owned(),
            expires_in: u64::try_from(self.token_lifetime.num_seconds()).unwrap_or(0),
            scope: granted.join(" "),
        })
    }

    /// Resolve the requested scope string against what the client was granted.
    fn resolve_scopes(
        &self,
        client: &OAuth2Client,
        requested: Option<&str>,
    ) -> Result<Vec<String>, OAuth2Error> {
        let requested = requested.unwrap_or("").trim();
        if requested.is_empty() {
            // omission grants everything the client holds
            return Ok(client.scopes.clone());
        }

        let mut granted = Vec::new();
        for scope in requested.split_whitespace() {
            if !client.has_scope(scope) {
                tracing::debug!(client_id = %client.client_id, scope, "requested scope not granted to client");
                return Err(OAuth2Error::invalid_scope(&format!(
                    "scope {scope:?} was not granted to this client"
                )));
            }
            granted.push(scope.to_owned());
        }
        Ok(granted)
    }

    /// Validate a bearer `Authorization` header and return the live token
    /// together with its (still live) client.
    ///
    /// # Errors
    /// Returns 401 for missing, malformed, unknown, or expired tokens, and
    /// for tokens whose client has since been archived.
    pub async fn validate_bearer(
        &self,
        authorization: Option<&str>,
    ) -> AppResult<(Token, OAuth2Client)> {
        let header = authorization.ok_or_else(AppError::auth_required)?;
        let access_token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::auth_invalid("malformed authorization header"))?;

        let token = self
            .token_store
            .get_valid(access_token)
            .ok_or_else(|| AppError::auth_invalid("invalid or expired token"))?;

        // Re-read the client so archival revokes outstanding tokens
        let client = self
            .database
            .get_oauth2_client_by_client_id(&token.client_id)
            .await?
            .ok_or_else(|| AppError::auth_invalid("invalid or expired token"))?;

        Ok((token, client))
    }

    /// Validate a bearer and enforce the scope the request path requires.
    ///
    /// # Errors
    /// Returns 401 for authentication failures and 403 when the token lacks
    /// the path's scope.
    pub async fn extract_client_from_request(
        &self,
        authorization: Option<&str>,
        path: &str,
    ) -> AppResult<(Token, OAuth2Client)> {
        let (token, client) = self.validate_bearer(authorization).await?;

        let required = scope_from_path(path);
        if !required.is_empty() && !token.has_scope(&required) {
            tracing::debug!(
                client_id = %client.client_id,
                scope = %required,
                "token lacks required scope"
            );
            return Err(AppError::forbidden(format!(
                "token does not carry the {required:?} scope"
            )));
        }

        Ok((token, client))
    }
}
