// ABOUTME: Shared server resources
// ABOUTME: One Arc'd bundle of database, crypto, OAuth2 engine, session builder, and publisher
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::ServerConfig;
use crate::crypto::SecretGenerator;
use crate::database_plugins::factory::Database;
use crate::events::DataChangesPublisher;
use crate::oauth2_server::{AuthorizationServer, TokenStore};
use crate::session::SessionContextBuilder;

/// Everything the route handlers share.
///
/// Constructed once at startup, cloned into every router via `Arc`.
pub struct ServerResources {
    pub database: Database,
    pub authenticator: Authenticator,
    pub secrets: SecretGenerator,
    pub token_store: Arc<TokenStore>,
    pub authorization: Arc<AuthorizationServer>,
    pub session: SessionContextBuilder,
    pub events: Arc<dyn DataChangesPublisher>,
    pub config: ServerConfig,
}

impl ServerResources {
    #[must_use]
    pub fn new(
        database: Database,
        events: Arc<dyn DataChangesPublisher>,
        config: ServerConfig,
    ) -> Self {
        let token_store = Arc::new(TokenStore::new());
        let secrets = SecretGenerator::new();
        let authorization = Arc::new(AuthorizationServer::new(
            database.clone(),
            Arc::clone(&token_store),
            secrets.clone(),
            config.token_lifetime_seconds,
        ));
        let session = SessionContextBuilder::new(
            database.clone(),
            Arc::clone(&authorization),
            &config.cookie_signing_key_bytes(),
            config.cookie_lifetime_seconds,
        );

        Self {
            database,
            authenticator: Authenticator::new(),
            secrets,
            token_store,
            authorization,
            session,
            events,
            config,
        }
    }
}
