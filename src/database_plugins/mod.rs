// ABOUTME: Credential store abstraction for the Mealtime server
// ABOUTME: Plugin architecture with SQLite (durable) and in-memory (test) backends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

//! Credential store abstraction.
//!
//! The core consumes a narrow interface over users and OAuth2 clients; the
//! backends are interchangeable through [`factory::Database`]. Archived rows
//! are invisible to every read path, which is what lets the authorization
//! engine treat archived and unknown clients identically.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    HouseholdInvitation, OAuth2Client, OAuth2ClientDatabaseCreationInput, Page, QueryFilter, User,
    UserDatabaseCreationInput,
};

pub mod factory;
pub mod memory;
pub mod sqlite;

/// Sentinel error for unique-constraint violations on user creation.
///
/// Surfaced through anyhow; handlers downcast to map it to the
/// compatibility-mandated 400 "username taken" response.
#[derive(Debug, Error)]
#[error("username or email address already in use")]
pub struct UserAlreadyExistsError;

/// Core credential store trait.
///
/// All backends implement this to provide a consistent interface to the
/// application layer. Reads return `Ok(None)` for unknown or archived rows;
/// mutations return `Ok(false)` when no live row matched.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + Clone {
    /// Set up the schema
    async fn migrate(&self) -> Result<()>;

    // ================================
    // User management
    // ================================

    /// Create a new user account; fails with [`UserAlreadyExistsError`] on
    /// username or email collision
    async fn create_user(&self, input: &UserDatabaseCreationInput) -> Result<User>;

    /// Get a live user by id
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Get a live user by exact username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get a live user by id regardless of enrollment state; used by the
    /// TOTP verification handler, which distinguishes pending from verified
    async fn get_user_with_unverified_two_factor_secret(
        &self,
        user_id: &str,
    ) -> Result<Option<User>>;

    /// Stamp the user's TOTP seed as verified
    async fn mark_user_two_factor_secret_as_verified(&self, user_id: &str) -> Result<bool>;

    /// Replace the TOTP seed and clear the verified stamp
    async fn mark_user_two_factor_secret_as_unverified(
        &self,
        user_id: &str,
        new_secret: &str,
    ) -> Result<bool>;

    /// Replace the stored password hash
    async fn update_user_password(&self, user_id: &str, new_hash: &str) -> Result<bool>;

    /// Replace the avatar blob reference
    async fn update_user_avatar(&self, user_id: &str, avatar_src: &str) -> Result<bool>;

    /// Soft-delete a user
    async fn archive_user(&self, user_id: &str) -> Result<bool>;

    // ================================
    // Household invitations
    // ================================

    /// Look up an invitation by its token and id pair
    async fn get_household_invitation_by_token_and_id(
        &self,
        token: &str,
        invitation_id: &str,
    ) -> Result<Option<HouseholdInvitation>>;

    // ================================
    // OAuth2 client management
    // ================================

    /// Persist a provisioned client; `client_id` uniqueness is enforced here
    async fn create_oauth2_client(
        &self,
        input: &OAuth2ClientDatabaseCreationInput,
    ) -> Result<OAuth2Client>;

    /// Get a live client by its internal database id (the one in URLs)
    async fn get_oauth2_client_by_id(&self, id: &str) -> Result<Option<OAuth2Client>>;

    /// Get a live client by its public OAuth2 `client_id`
    async fn get_oauth2_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<OAuth2Client>>;

    /// Page over a user's live clients
    async fn get_oauth2_clients(
        &self,
        belongs_to_user: &str,
        filter: &QueryFilter,
    ) -> Result<Page<OAuth2Client>>;

    /// Soft-delete a client; archived clients stop authenticating immediately
    async fn archive_oauth2_client(&self, id: &str) -> Result<bool>;
}
