// ABOUTME: OAuth2 token endpoint routes
// ABOUTME: POST /oauth2/token speaks the RFC 6749 wire format, not the app error shape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};

use crate::oauth2_server::{OAuth2Error, TokenRequest, TokenResponse};
use crate::resources::ServerResources;

pub struct OAuth2Routes;

impl OAuth2Routes {
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/oauth2/token", post(Self::token))
            .with_state(resources)
    }

    async fn token(
        State(resources): State<Arc<ServerResources>>,
        request: Result<Form<TokenRequest>, FormRejection>,
    ) -> Result<Json<TokenResponse>, OAuth2Error> {
        // A body the Form extractor cannot parse still gets the RFC 6749
        // error shape, not axum's plain-text rejection
        let Form(request) = request
            .map_err(|_| OAuth2Error::invalid_request("request body must be a urlencoded form"))?;
        resources.authorization.token(&request).await.map(Json)
    }
}
