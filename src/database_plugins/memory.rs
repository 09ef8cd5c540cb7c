// ABOUTME: In-memory credential store backend
// ABOUTME: HashMap-based implementation used by tests and ephemeral deployments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database_plugins::{DatabaseProvider, UserAlreadyExistsError};
use crate::models::{
    HouseholdInvitation, OAuth2Client, OAuth2ClientDatabaseCreationInput, Page, QueryFilter, User,
    UserDatabaseCreationInput,
};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    invitations: HashMap<String, HouseholdInvitation>,
    clients: HashMap<String, OAuth2Client>,
}

/// In-memory credential store; identical observable semantics to the SQLite
/// backend, without durability
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an invitation; test helper for the registration flow.
    pub async fn insert_household_invitation(&self, invitation: HouseholdInvitation) {
        self.inner
            .write()
            .await
            .invitations
            .insert(invitation.id.clone(), invitation);
    }
}

#[async_trait]
impl DatabaseProvider for MemoryDatabase {
    async fn migrate(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, input: &UserDatabaseCreationInput) -> Result<User> {
        let mut inner = self.inner.write().await;
        let collision = inner.users.values().any(|u| {
            u.archived_at.is_none()
                && (u.username == input.username || u.email_address == input.email_address)
        });
        if collision {
            return Err(UserAlreadyExistsError.into());
        }

        let user = User {
            id: input.id.clone(),
            username: input.username.clone(),
            email_address: input.email_address.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            birthday: input.birthday,
            hashed_password: input.hashed_password.clone(),
            two_factor_secret: input.two_factor_secret.clone(),
            two_factor_secret_verified_at: None,
            avatar_src: None,
            default_household_id: input.default_household_id.clone(),
            created_at: Utc::now(),
            archived_at: None,
        };
        inner.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(user_id)
            .filter(|u| u.archived_at.is_none())
            .cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username && u.archived_at.is_none())
            .cloned())
    }

    async fn get_user_with_unverified_two_factor_secret(
        &self,
        user_id: &str,
    ) -> Result<Option<User>> {
        self.get_user(user_id).await
    }

    async fn mark_user_two_factor_secret_as_verified(&self, user_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .users
            .get_mut(user_id)
            .filter(|u| u.archived_at.is_none())
        {
            Some(user) => {
                user.two_factor_secret_verified_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_user_two_factor_secret_as_unverified(
        &self,
        user_id: &str,
        new_secret: &str,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .users
            .get_mut(user_id)
            .filter(|u| u.archived_at.is_none())
        {
            Some(user) => {
                user.two_factor_secret = new_secret.to_owned();
                user.two_factor_secret_verified_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_user_password(&self, user_id: &str, new_hash: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .users
            .get_mut(user_id)
            .filter(|u| u.archived_at.is_none())
        {
            Some(user) => {
                user.hashed_password = new_hash.to_owned();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_user_avatar(&self, user_id: &str, avatar_src: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .users
            .get_mut(user_id)
            .filter(|u| u.archived_at.is_none())
        {
            Some(user) => {
                user.avatar_src = Some(avatar_src.to_owned());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn archive_user(&self, user_id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .users
            .get_mut(user_id)
            .filter(|u| u.archived_at.is_none())
        {
            Some(user) => {
                user.archived_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_household_invitation_by_token_and_id(
        &self,
        token: &str,
        invitation_id: &str,
    ) -> Result<Option<HouseholdInvitation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .invitations
            .get(invitation_id)
            .filter(|i| i.token == token)
            .cloned())
    }

    async fn create_oauth2_client(
        &self,
        input: &OAuth2ClientDatabaseCreationInput,
    ) -> Result<OAuth2Client> {
        let mut inner = self.inner.write().await;
        let client = OAuth2Client {
            id: input.id.clone(),
            client_id: input.client_id.clone(),
            client_secret: input.client_secret.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            scopes: input.scopes.clone(),
            implicit_allowed: input.implicit_allowed,
            belongs_to_user: input.belongs_to_user.clone(),
            created_at: Utc::now(),
            archived_at: None,
        };
        inner.clients.insert(client.id.clone(), client.clone());
        Ok(client)
    }

    async fn get_oauth2_client_by_id(&self, id: &str) -> Result<Option<OAuth2Client>> {
        let inner = self.inner.read().await;
        Ok(inner
            .clients
            .get(id)
            .filter(|c| c.archived_at.is_none())
            .cloned())
    }

    async fn get_oauth2_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<OAuth2Client>> {
        let inner = self.inner.read().await;
        Ok(inner
            .clients
            .values()
            .find(|c| c.client_id == client_id && c.archived_at.is_none())
            .cloned())
    }

    async fn get_oauth2_clients(
        &self,
        belongs_to_user: &str,
        filter: &QueryFilter,
    ) -> Result<Page<OAuth2Client>> {
        let inner = self.inner.read().await;
        let mut matching: Vec<OAuth2Client> = inner
            .clients
            .values()
            .filter(|c| c.belongs_to_user == belongs_to_user && c.archived_at.is_none())
            .cloned()
            .collect();

        matching.sort_by(|a, b| a.id.cmp(&b.id));
        if filter.descending() {
            matching.reverse();
        }

        let total_count = matching.len() as u64;
        let page = filter.page();
        let limit = filter.limit();
        let start = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let data = matching
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();

        Ok(Page {
            data,
            page,
            limit,
            total_count,
        })
    }

    async fn archive_oauth2_client(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .clients
            .get_mut(id)
            .filter(|c| c.archived_at.is_none())
        {
            Some(client) => {
                client.archived_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
