// ABOUTME: Credential store factory with URL-based backend selection
// ABOUTME: Enum dispatch over the SQLite and in-memory backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::database_plugins::memory::MemoryDatabase;
use crate::database_plugins::sqlite::SqliteDatabase;
use crate::database_plugins::DatabaseProvider;
use crate::models::{
    HouseholdInvitation, OAuth2Client, OAuth2ClientDatabaseCreationInput, Page, QueryFilter, User,
    UserDatabaseCreationInput,
};

/// Credential store chosen from the configured database URL.
///
/// `sqlite:` URLs select the durable backend; `memory:` selects the
/// ephemeral one.
#[derive(Clone)]
pub enum Database {
    Sqlite(SqliteDatabase),
    Memory(MemoryDatabase),
}

impl Database {
    /// Construct the backend for `database_url`.
    ///
    /// # Errors
    /// Returns an error for unrecognized URL schemes or connection failures.
    pub async fn new(database_url: &str) -> Result<Self> {
        if database_url.starts_with("sqlite:") {
            Ok(Self::Sqlite(SqliteDatabase::new(database_url).await?))
        } else if database_url == "memory:" {
            Ok(Self::Memory(MemoryDatabase::new()))
        } else {
            bail!("unsupported database URL: {database_url}")
        }
    }

    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $db:ident => $body:expr) => {
        match $self {
            Database::Sqlite($db) => $body,
            Database::Memory($db) => $body,
        }
    };
}

#[async_trait]
impl DatabaseProvider for Database {
    async fn migrate(&self) -> Result<()> {
        delegate!(self, db => db.migrate().await)
    }

    async fn create_user(&self, input: &UserDatabaseCreationInput) -> Result<User> {
        delegate!(self, db => db.create_user(input).await)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        delegate!(self, db => db.get_user(user_id).await)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        delegate!(self, db => db.get_user_by_username(username).await)
    }

    async fn get_user_with_unverified_two_factor_secret(
        &self,
        user_id: &str,
    ) -> Result<Option<User>> {
        delegate!(self, db => db.get_user_with_unverified_two_factor_secret(user_id).await)
    }

    async fn mark_user_two_factor_secret_as_verified(&self, user_id: &str) -> Result<bool> {
        delegate!(self, db => db.mark_user_two_factor_secret_as_verified(user_id).await)
    }

    async fn mark_user_two_factor_secret_as_unverified(
        &self,
        user_id: &str,
        new_secret: &str,
    ) -> Result<bool> {
        delegate!(self, db => db.mark_user_two_factor_secret_as_unverified(user_id, new_secret).await)
    }

    async fn update_user_password(&self, user_id: &str, new_hash: &str) -> Result<bool> {
        delegate!(self, db => db.update_user_password(user_id, new_hash).await)
    }

    async fn update_user_avatar(&self, user_id: &str, avatar_src: &str) -> Result<bool> {
        delegate!(self, db => db.update_user_avatar(user_id, avatar_src).await)
    }

    async fn archive_user(&self, user_id: &str) -> Result<bool> {
        delegate!(self, db => db.archive_user(user_id).await)
    }

    async fn get_household_invitation_by_token_and_id(
        &self,
        token: &str,
        invitation_id: &str,
    ) -> Result<Option<HouseholdInvitation>> {
        delegate!(self, db => db.get_household_invitation_by_token_and_id(token, invitation_id).await)
    }

    async fn create_oauth2_client(
        &self,
        input: &OAuth2ClientDatabaseCreationInput,
    ) -> Result<OAuth2Client> {
        delegate!(self, db => db.create_oauth2_client(input).await)
    }

    async fn get_oauth2_client_by_id(&self, id: &str) -> Result<Option<OAuth2Client>> {
        delegate!(self, db => db.get_oauth2_client_by_id(id).await)
    }

    async fn get_oauth2_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<OAuth2Client>> {
        delegate!(self, db => db.get_oauth2_client_by_client_id(client_id).await)
    }

    async fn get_oauth2_clients(
        &self,
        belongs_to_user: &str,
        filter: &QueryFilter,
    ) -> Result<Page<OAuth2Client>> {
        delegate!(self, db => db.get_oauth2_clients(belongs_to_user, filter).await)
    }

    async fn archive_oauth2_client(&self, id: &str) -> Result<bool> {
        delegate!(self, db => db.archive_oauth2_client(id).await)
    }
}
