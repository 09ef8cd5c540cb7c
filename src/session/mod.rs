// ABOUTME: Per-request session context extraction
// ABOUTME: Bearer tokens resolve to the client owner; signed cookies resolve to the logged-in user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

//! # Session Context
//!
//! Every protected handler starts by building a [`SessionContextData`] for
//! the request. Bearer tokens win over cookies: a valid bearer resolves to
//! the user who owns the OAuth2 client, a valid signed cookie resolves to
//! the user who logged in, and anything else is a 401.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::database_plugins::factory::Database;
use crate::database_plugins::DatabaseProvider;
use crate::errors::{AppError, AppResult};
use crate::models::{SessionContextData, User};
use crate::oauth2_server::AuthorizationServer;

type HmacSha256 = Hmac<Sha256>;

/// Name of the signed session cookie
pub const SESSION_COOKIE_NAME: &str = "mealtime_session";

/// Builds session contexts from request credentials and mints the signed
/// session cookie at login.
#[derive(Clone)]
pub struct SessionContextBuilder {
    database: Database,
    authorization: Arc<AuthorizationServer>,
    signing_key: Vec<u8>,
    cookie_lifetime_seconds: i64,
}

impl SessionContextBuilder {
    #[must_use]
    pub fn new(
        database: Database,
        authorization: Arc<AuthorizationServer>,
        signing_key: &[u8],
        cookie_lifetime_seconds: i64,
    ) -> Self {
        Self {
            database,
            authorization,
            signing_key: signing_key.to_vec(),
            cookie_lifetime_seconds,
        }
    }

    /// Build the session context for a request.
    ///
    /// # Errors
    /// 401 when neither a valid bearer nor a valid cookie is present; 403
    /// when a bearer is valid but lacks the path's scope.
    pub async fn session_context(
        &self,
        authorization: Option<&str>,
        jar: &CookieJar,
        path: &str,
    ) -> AppResult<SessionContextData> {
        if authorization.is_some() {
            let (_, client) = self
                .authorization
                .extract_client_from_request(authorization, path)
                .await?;
            let user = self
                .database
                .get_user(&client.belongs_to_user)
                .await?
                .ok_or_else(|| AppError::auth_invalid("token owner no longer exists"))?;
            let context = SessionContextData::for_user(&user);
            tracing::debug!(user_id = %context.requester.user_id, "request authenticated via bearer token");
            return Ok(context);
        }

        if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
            let context = self.context_from_cookie(cookie.value()).await?;
            tracing::debug!(user_id = %context.requester.user_id, "request authenticated via session cookie");
            return Ok(context);
        }

        Err(AppError::auth_required())
    }

    /// Verify and decode a session cookie value.
    async fn context_from_cookie(&self, value: &str) -> AppResult<SessionContextData> {
        let (user_id, household_id, expires_unix) = self.verify_cookie_value(value)?;

        if expires_unix <= Utc::now().timestamp() {
            return Err(AppError::auth_invalid("session expired"));
        }

        let user = self
            .database
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AppError::auth_invalid("session user no longer exists"))?;

        let mut context = SessionContextData::for_user(&user);
        context.active_household_id = household_id;
        Ok(context)
    }

    /// Cookie payload is `user_id:household_id:expires:signature` where the
    /// signature is HMAC-SHA256 over the first three fields.
    fn verify_cookie_value(&self, value: &str) -> AppResult<(String, String, i64)> {
        let malformed = || AppError::auth_invalid("malformed session cookie");

        let (payload, signature_hex) = value.rsplit_once(':').ok_or_else(malformed)?;
        let signature = hex::decode(signature_hex).map_err(|_| malformed())?;

        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|_| AppError::internal("session signing key is unusable"))?;
        mac.update(payload.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| AppError::auth_invalid("session signature mismatch"))?;

        let mut fields = payload.splitn(3, ':');
        let user_id = fields.next().ok_or_else(malformed)?.to_owned();
        let household_id = fields.next().ok_or_else(malformed)?.to_owned();
        let expires_unix: i64 = fields
            .next()
            .ok_or_else(malformed)?
            .parse()
            .map_err(|_| malformed())?;

        Ok((user_id, household_id, expires_unix))
    }

    fn sign_cookie_value(&self, user_id: &str, household_id: &str, expires_unix: i64) -> AppResult<String> {
        let payload = format!("{user_id}:{household_id}:{expires_unix}");
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|_| AppError::internal("session signing key is unusable"))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{payload}:{signature}"))
    }

    /// Mint the session cookie handed out at login.
    ///
    /// # Errors
    /// Returns an internal error when the signing key is unusable.
    pub fn issue_cookie(&self, user: &User) -> AppResult<Cookie<'static>> {
        let expires_unix = Utc::now().timestamp() + self.cookie_lifetime_seconds;
        let value =
            self.sign_cookie_value(&user.id, &user.default_household_id, expires_unix)?;
        Ok(self.base_cookie(value, time::Duration::seconds(self.cookie_lifetime_seconds)))
    }

    /// A replacement cookie that instructs the browser to drop the session.
    #[must_use]
    pub fn expired_cookie(&self) -> Cookie<'static> {
        self.base_cookie(String::new(), time::Duration::seconds(-1))
    }

    fn base_cookie(&self, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretGenerator;
    use crate::models::{new_id, UserDatabaseCreationInput};
    use crate::oauth2_server::TokenStore;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    async fn builder_with_user() -> (SessionContextBuilder, User) {
        let database = Database::new("memory:").await.unwrap();
        let user = database
            .create_user(&UserDatabaseCreationInput {
                id: new_id(),
                username: "ada".into(),
                email_address: "ada@example.test".into(),
                first_name: None,
                last_name: None,
                birthday: None,
                hashed_password: "$argon2id$fake".into(),
                two_factor_secret: "SEED".into(),
                default_household_id: new_id(),
            })
            .await
            .unwrap();

        let authorization = Arc::new(AuthorizationServer::new(
            database.clone(),
            Arc::new(TokenStore::new()),
            SecretGenerator::new(),
            3600,
        ));
        let builder = SessionContextBuilder::new(database, authorization, KEY, 3600);
        (builder, user)
    }

    #[tokio::test]
    async fn test_issued_cookie_round_trips() {
        let (builder, user) = builder_with_user().await;

        let cookie = builder.issue_cookie(&user).unwrap();
        let jar = CookieJar::new().add(cookie.into_owned());

        let context = builder.session_context(None, &jar, "/api/v1/households").await.unwrap();
        assert_eq!(context.requester.user_id, user.id);
        assert_eq!(context.active_household_id, user.default_household_id);
    }

    #[tokio::test]
    async fn test_tampered_cookie_rejected() {
        let (builder, user) = builder_with_user().await;

        let cookie = builder.issue_cookie(&user).unwrap();
        let tampered = cookie.value().replacen(&user.id, &new_id(), 1);
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, tampered));

        let err = builder
            .session_context(None, &jar, "/")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[tokio::test]
    async fn test_expired_cookie_value_rejected() {
        let (builder, user) = builder_with_user().await;

        let stale = builder
            .sign_cookie_value(&user.id, &user.default_household_id, Utc::now().timestamp() - 10)
            .unwrap();
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, stale));

        let err = builder.session_context(None, &jar, "/").await.unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[tokio::test]
    async fn test_no_credentials_is_auth_required() {
        let (builder, _) = builder_with_user().await;
        let err = builder
            .session_context(None, &CookieJar::new(), "/")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[tokio::test]
    async fn test_logout_cookie_expires_immediately() {
        let (builder, _) = builder_with_user().await;

        let cookie = builder.expired_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert!(cookie.value().is_empty());
        assert!(cookie.max_age().unwrap().is_negative());
    }
}
