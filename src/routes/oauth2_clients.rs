// ABOUTME: OAuth2 client management API
// ABOUTME: List, create, read, and archive clients; the secret is disclosed only at creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::database_plugins::DatabaseProvider;
use crate::errors::AppError;
use crate::events::{DataChangeEventType, DataChangeMessage};
use crate::models::{
    new_id, OAuth2Client, OAuth2ClientCreationRequestInput, OAuth2ClientCreationResponse,
    OAuth2ClientDatabaseCreationInput, QueryFilter,
};
use crate::resources::ServerResources;
use crate::routes::session_context;

/// Client ids and secrets are 16 random octets each, hex-encoded (32 characters)
const CLIENT_ID_OCTETS: usize = 16;
const CLIENT_SECRET_OCTETS: usize = 16;

pub struct OAuth2ClientRoutes;

impl OAuth2ClientRoutes {
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/v1/oauth2_clients",
                get(Self::list).post(Self::create),
            )
            .route(
                "/api/v1/oauth2_clients/",
                get(Self::list).post(Self::create),
            )
            .route(
                "/api/v1/oauth2_clients/:id",
                get(Self::read).delete(Self::archive),
            )
            .route(
                "/api/v1/oauth2_clients/:id/",
                get(Self::read).delete(Self::archive),
            )
            .with_state(resources)
    }

    /// `GET /api/v1/oauth2_clients/`; an empty page is a 200, never a 404.
    async fn list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Query(filter): Query<QueryFilter>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        let page = resources
            .database
            .get_oauth2_clients(&context.requester.user_id, &filter)
            .await?;

        Ok(Json(page).into_response())
    }

    /// `POST /api/v1/oauth2_clients/`; the one moment the secret is visible.
    async fn create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Json(input): Json<OAuth2ClientCreationRequestInput>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;
        input.validate()?;

        let client_id = resources
            .secrets
            .hex_string(CLIENT_ID_OCTETS)
            .map_err(|e| AppError::internal("secret generation failed").with_source(e))?;
        let client_secret = resources
            .secrets
            .hex_string(CLIENT_SECRET_OCTETS)
            .map_err(|e| AppError::internal("secret generation failed").with_source(e))?;

        let client = resources
            .database
            .create_oauth2_client(&OAuth2ClientDatabaseCreationInput {
                id: new_id(),
                client_id,
                client_secret,
                name: input.name.trim().to_owned(),
                description: input.description,
                scopes: input.scopes,
                implicit_allowed: input.implicit_allowed,
                belongs_to_user: context.requester.user_id.clone(),
            })
            .await?;

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::OAuth2ClientCreated)
                .with_user(&context.requester.user_id)
                .with_context("oauth2_client_id", &client.id),
        );

        tracing::info!(
            oauth2_client_id = %client.id,
            user_id = %context.requester.user_id,
            "provisioned oauth2 client"
        );

        let response = OAuth2ClientCreationResponse {
            id: client.id,
            client_id: client.client_id,
            client_secret: client.client_secret,
        };
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// `GET /api/v1/oauth2_clients/{id}`; the secret is elided from the body.
    async fn read(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        let client = Self::owned_client(&resources, &id, &context.requester.user_id).await?;
        Ok(Json(client).into_response())
    }

    /// `DELETE /api/v1/oauth2_clients/{id}`; idempotence through 404 on replay.
    async fn archive(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        jar: CookieJar,
        uri: Uri,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let context = session_context(&resources, &headers, &jar, &uri).await?;

        let client = Self::owned_client(&resources, &id, &context.requester.user_id).await?;
        if !resources.database.archive_oauth2_client(&client.id).await? {
            return Err(AppError::not_found("oauth2 client"));
        }

        resources.events.publish(
            DataChangeMessage::new(DataChangeEventType::OAuth2ClientArchived)
                .with_user(&context.requester.user_id)
                .with_context("oauth2_client_id", &client.id),
        );

        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Fetch a live client, treating other users' clients as nonexistent.
    async fn owned_client(
        resources: &ServerResources,
        id: &str,
        user_id: &str,
    ) -> Result<OAuth2Client, AppError> {
        let client = resources
            .database
            .get_oauth2_client_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("oauth2 client"))?;

        if client.belongs_to_user != user_id {
            return Err(AppError::not_found("oauth2 client"));
        }
        Ok(client)
    }
}
