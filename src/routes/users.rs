// ABOUTME: User registration, TOTP enrollment, and credential-change API
// ABOUTME: The TOTP seed and QR code are disclosed exactly once, at 201 and at rotation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose, Engine as _};

use crate::auth::password_policy::validate_password_entropy;
use crate::auth::qr::build_qr_code;
use crate::auth::totp;
use crate::database_plugins::{DatabaseProvider, UserAlreadyExistsError};
use crate::errors::AppError;
use crate::events::{DataChangeEventType, DataChangeMessage};
use crate::models::{
    new_id, AvatarUpdateInput, PasswordUpdateInput, TOTPSecretRefreshInput,
    TOTPSecretRefreshResponse, TOTPSecretVerificationInput, User, UserCreationResponse,
    UserDatabaseCreationInput, UserRegistrationInput,
};
use crate::resources::ServerResources;
use crate::routes::session_context;

/// TOTP seeds are 64 random octets (104 base32 characters)
const TOTP_SECRET_OCTETS: usize = 64;

pub struct UserRoutes;

impl UserRoutes {
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/users", post(Self::register))
            .route("/users/", post(Self::register))
            .route("/users/totp_secret/verify", post(Self::verify_totp_secret))
            .route(
                "/api/v1/users/totp_secret/new",
                post(Self::rotate_totp_secret),
            )
            .route("/api/v1/users/password/new", put(Self::update_password))
            .route("/api/v1/users/avatar/upload", post(Self::upload_avatar))
            .route("/api/v1/users/:id", delete(Self::archive))
            .route("/api/v1/users/:id/", delete(Self::archive))
            .with_state(resources)
    }

    /// `POST /users/`: register an account.
    ///
    /// The 201 body is the only time the TOTP seed and its QR code are
    /// disclosed; the account cannot log in with TOTP until the seed is
    /// verified.
    async fn register(
        State(resources): State<Arc<ServerResources>>,
        Json(input): Json<UserRegistrationInput>,
    ) -> Result<Response, AppError> {
        if !resources.config.signups_enabled {
            return Err(AppError::forbidden("user registration is disabled"));
        }

        input.validate(
            resources.config.min_username_length,
            resources.config.min_password_length,
        )?;
        validate_password_entropy(&input.password, resources.config.minimum_password_entropy)?;

        // An invitation, when referenced, must exist; its destination
        // household replaces the fresh default
        let destination_household = match (&input.invitation_id, &input.invitation_token) {
            (Some(id), Some(token)) => {
                let invitation = resources
                    .database
                    .get_household_invitation_by_token_and_id(token, id)
                    .await?
                    .ok_or_else(|| AppError::not_found("household invitation"))?;
                Some(invitation.destination_household)
            }
            (None, None) => None,
            _ => {
                return Err(AppError::invalid_input(
                    "invitation_id and invitation_token must be provided together",
                ))
            }
        };

        let hashed_password = resources
            .authenticator
            .hash_password(input.password.trim())
            .map_err(|e| AppError::internal("password hashing failed").with_source(e))?;
        let two_factor_secret = resources
            .secrets
            .base32_string(TOTP_SECRET_OCTETS)
            .map_err(|e| AppError::internal("secret generation failed").with_source(e))?;

        let username = input.username.trim().to_owned();
        let creation = UserDatabaseCreationInput {
            id: new_id(),
            username: username.clone(),
            email_address: input.email_address.trim().to_lowercase(),
            first_name: input.first_name,
            last_name: input.last_name,
            birthday: input.birthday,
            hashed_password,
            two_factor_secret,
            default_household_id: destination_household.unwrap_or_else(new_id),
        };

        let user = match resources.database.create_user(&creation).await {
            Ok(user) => user,
            Err(e) if e.downcast_ref::<UserAlreadyExistsError>().is_some() => {
                return Err(AppError::invalid_input(
                    "username or email address already taken",
                ))
            }
            Err(e) => return Err(e.into()),
        };

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::UserSignedUp)
                .with_user(&user.id)
                .with_household(&user.default_household_id),
        );

        tracing::info!(user_id = %user.id, "registered new user");

        let response = UserCreationResponse {
            created_user_id: user.id.clone(),
            username: user.username.clone(),
            email_address: user.email_address.clone(),
            created_at: user.created_at,
            two_factor_qr_code: build_qr_code(&user.username, &user.two_factor_secret),
            two_factor_secret: user.two_factor_secret,
        };
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// `POST /users/totp_secret/verify`: prove possession of the enrolled
    /// seed. 202 on first success, 208 when already verified.
    async fn verify_totp_secret(
        State(resources): State<Arc<ServerResources>>,
        Json(input): Json<TOTPSecretVerificationInput>,
    ) -> Result<Response, AppError> {
        input.validate()?;

        let user = resources
            .database
            .get_user_with_unverified_two_factor_secret(&input.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        if user.two_factor_secret_verified_at.is_some() {
            return Err(AppError::already_reported(
                "two factor secret is already verified",
            ));
        }

        let valid = totp::validate_code(&user.two_factor_secret, &input.totp_token)
            .map_err(|e| AppError::internal("stored two factor secret is unusable").with_source(e))?;
        if !valid {
            return Err(AppError::invalid_input("invalid token"));
        }

        if !resources
            .database
            .mark_user_two_factor_secret_as_verified(&user.id)
            .await?
        {
            return Err(AppError::not_found("user"));
        }

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::TwoFactorSecretVerified)
                .with_user(&user.id),
        );

        Ok(StatusCode::ACCEPTED.into_response())
    }

    /// `POST /api/v1/users/totp_secret/new`: rotate the seed. The account
    /// must have a verified seed first (412 otherwise); the replacement
    /// starts unverified.
    async fn rotate_totp_secret(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Json(input): Json<TOTPSecretRefreshInput>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        let user = validate_credential_change_request(
            &resources,
            &context.requester.user_id,
            &input.current_password,
            &input.totp_token,
        )
        .await?;

        if user.two_factor_secret_verified_at.is_none() {
            return Err(AppError::precondition_failed(
                "two factor secret has not been verified",
            ));
        }

        let new_secret = resources
            .secrets
            .base32_string(TOTP_SECRET_OCTETS)
            .map_err(|e| AppError::internal("secret generation failed").with_source(e))?;

        if !resources
            .database
            .mark_user_two_factor_secret_as_unverified(&user.id, &new_secret)
            .await?
        {
            return Err(AppError::not_found("user"));
        }

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::TwoFactorSecretChanged)
                .with_user(&user.id),
        );

        let response = TOTPSecretRefreshResponse {
            two_factor_qr_code: build_qr_code(&user.username, &new_secret),
            two_factor_secret: new_secret,
        };
        Ok((StatusCode::ACCEPTED, Json(response)).into_response())
    }

    /// `PUT /api/v1/users/password/new`: change the password. 202 clears
    /// the session cookie; every device logs in again.
    async fn update_password(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Json(input): Json<PasswordUpdateInput>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        let user = validate_credential_change_request(
            &resources,
            &context.requester.user_id,
            &input.current_password,
            &input.totp_token,
        )
        .await?;

        if input.new_password.trim().chars().count() < resources.config.min_password_length {
            return Err(AppError::invalid_input(format!(
                "password must be at least {} characters",
                resources.config.min_password_length
            )));
        }
        validate_password_entropy(
            &input.new_password,
            resources.config.minimum_password_entropy,
        )?;

        let new_hash = resources
            .authenticator
            .hash_password(&input.new_password)
            .map_err(|e| AppError::internal("password hashing failed").with_source(e))?;

        if !resources
            .database
            .update_user_password(&user.id, &new_hash)
            .await?
        {
            return Err(AppError::not_found("user"));
        }

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::PasswordChanged).with_user(&user.id),
        );

        tracing::info!(user_id = %user.id, "password changed");

        let jar = jar.add(resources.session.expired_cookie());
        Ok((jar, StatusCode::ACCEPTED).into_response())
    }

    /// `POST /api/v1/users/avatar/upload`
    async fn upload_avatar(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Json(input): Json<AvatarUpdateInput>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        if general_purpose::STANDARD
            .decode(&input.base64_encoded_data)
            .is_err()
        {
            return Err(AppError::invalid_input("avatar data is not valid base64"));
        }

        if !resources
            .database
            .update_user_avatar(&context.requester.user_id, &input.base64_encoded_data)
            .await?
        {
            return Err(AppError::not_found("user"));
        }

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::AvatarUpdated)
                .with_user(&context.requester.user_id),
        );

        Ok(StatusCode::ACCEPTED.into_response())
    }

    /// `DELETE /api/v1/users/{id}`: archive your own account.
    async fn archive(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        if context.requester.user_id != id {
            return Err(AppError::forbidden("cannot archive another user"));
        }

        if !resources.database.archive_user(&id).await? {
            return Err(AppError::not_found("user"));
        }

        resources
            .events
            .publish(DataChangeMessage::new(DataChangeEventType::UserArchived).with_user(&id));

        let jar = jar.add(resources.session.expired_cookie());
        Ok((jar, StatusCode::NO_CONTENT).into_response())
    }
}

/// Fetch the user and verify the credentials presented with a credential
/// change. 404 for a missing user, 400 when the inputs cannot be checked,
/// 401 for a clean mismatch.
pub(crate) async fn validate_credential_change_request(
    resources: &ServerResources,
    user_id: &str,
    current_password: &str,
    totp_token: &str,
) -> Result<User, AppError> {
    let user = resources
        .database
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    // TOTP only binds once the seed has been verified
    let seed = if user.two_factor_secret_verified_at.is_some() {
        user.two_factor_secret.as_str()
    } else {
        ""
    };

    let valid = resources
        .authenticator
        .credentials_are_valid(&user.hashed_password, current_password, seed, totp_token)
        .map_err(|e| AppError::invalid_input("credentials could not be validated").with_source(e))?;

    if !valid {
        return Err(AppError::auth_invalid("invalid credentials"));
    }
    Ok(user)
}
