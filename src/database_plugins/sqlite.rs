// ABOUTME: SQLite credential store backend
// ABOUTME: Schema setup plus runtime sqlx queries for users, invitations, and OAuth2 clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::database_plugins::{DatabaseProvider, UserAlreadyExistsError};
use crate::models::{
    HouseholdInvitation, OAuth2Client, OAuth2ClientDatabaseCreationInput, Page, QueryFilter, User,
    UserDatabaseCreationInput,
};

/// SQLite-backed credential store
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (and create if missing) the database at `database_url`.
    ///
    /// # Errors
    /// Returns an error when the URL does not parse or the pool cannot connect.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite database URL: {database_url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect to sqlite database")?;

        Ok(Self { pool })
    }

    fn user_from_row(row: &SqliteRow) -> Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email_address: row.try_get("email_address")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            birthday: row.try_get::<Option<NaiveDate>, _>("birthday")?,
            hashed_password: row.try_get("hashed_password")?,
            two_factor_secret: row.try_get("two_factor_secret")?,
            two_factor_secret_verified_at: row
                .try_get::<Option<DateTime<Utc>>, _>("two_factor_secret_verified_at")?,
            avatar_src: row.try_get("avatar_src")?,
            default_household_id: row.try_get("default_household_id")?,
            created_at: row.try_get("created_at")?,
            archived_at: row.try_get::<Option<DateTime<Utc>>, _>("archived_at")?,
        })
    }

    fn client_from_row(row: &SqliteRow) -> Result<OAuth2Client> {
        let scopes: String = row.try_get("scopes")?;
        Ok(OAuth2Client {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            client_secret: row.try_get("client_secret")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            scopes: split_scopes(&scopes),
            implicit_allowed: row.try_get("implicit_allowed")?,
            belongs_to_user: row.try_get("belongs_to_user")?,
            created_at: row.try_get("created_at")?,
            archived_at: row.try_get::<Option<DateTime<Utc>>, _>("archived_at")?,
        })
    }
}

fn join_scopes(scopes: &[String]) -> String {
    scopes.join(",")
}

fn split_scopes(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[async_trait]
impl DatabaseProvider for SqliteDatabase {
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email_address TEXT NOT NULL UNIQUE,
                first_name TEXT,
                last_name TEXT,
                birthday DATE,
                hashed_password TEXT NOT NULL,
                two_factor_secret TEXT NOT NULL,
                two_factor_secret_verified_at TIMESTAMP,
                avatar_src TEXT,
                default_household_id TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                archived_at TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS household_invitations (
                id TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                destination_household TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS oauth2_clients (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL UNIQUE,
                client_secret TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                scopes TEXT NOT NULL DEFAULT '',
                implicit_allowed BOOLEAN NOT NULL DEFAULT FALSE,
                belongs_to_user TEXT NOT NULL REFERENCES users(id),
                created_at TIMESTAMP NOT NULL,
                archived_at TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_oauth2_clients_owner ON oauth2_clients(belongs_to_user)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_user(&self, input: &UserDatabaseCreationInput) -> Result<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO users (
                id, username, email_address, first_name, last_name, birthday,
                hashed_password, two_factor_secret, default_household_id, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(&input.id)
        .bind(&input.username)
        .bind(&input.email_address)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.birthday)
        .bind(&input.hashed_password)
        .bind(&input.two_factor_secret)
        .bind(&input.default_household_id)
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(User {
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
                created_at,
                archived_at: None,
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(UserAlreadyExistsError.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1 AND archived_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1 AND archived_at IS NULL")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_user_with_unverified_two_factor_secret(
        &self,
        user_id: &str,
    ) -> Result<Option<User>> {
        // Same shape as get_user; the handler inspects the verified stamp to
        // tell a pending enrollment from an already-verified one
        self.get_user(user_id).await
    }

    async fn mark_user_two_factor_secret_as_verified(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE users SET two_factor_secret_verified_at = ?1
            WHERE id = ?2 AND archived_at IS NULL
            ",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_user_two_factor_secret_as_unverified(
        &self,
        user_id: &str,
        new_secret: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE users SET two_factor_secret = ?1, two_factor_secret_verified_at = NULL
            WHERE id = ?2 AND archived_at IS NULL
            ",
        )
        .bind(new_secret)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_user_password(&self, user_id: &str, new_hash: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET hashed_password = ?1 WHERE id = ?2 AND archived_at IS NULL")
                .bind(new_hash)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_user_avatar(&self, user_id: &str, avatar_src: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET avatar_src = ?1 WHERE id = ?2 AND archived_at IS NULL")
                .bind(avatar_src)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn archive_user(&self, user_id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET archived_at = ?1 WHERE id = ?2 AND archived_at IS NULL")
                .bind(Utc::now())
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_household_invitation_by_token_and_id(
        &self,
        token: &str,
        invitation_id: &str,
    ) -> Result<Option<HouseholdInvitation>> {
        let row = sqlx::query(
            "SELECT * FROM household_invitations WHERE token = ?1 AND id = ?2",
        )
        .bind(token)
        .bind(invitation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(HouseholdInvitation {
                id: row.try_get("id")?,
                token: row.try_get("token")?,
                destination_household: row.try_get("destination_household")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn create_oauth2_client(
        &self,
        input: &OAuth2ClientDatabaseCreationInput,
    ) -> Result<OAuth2Client> {
        let created_at = Utc::now();
        sqlx::query(
            r"
            INSERT INTO oauth2_clients (
                id, client_id, client_secret, name, description, scopes,
                implicit_allowed, belongs_to_user, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(&input.id)
        .bind(&input.client_id)
        .bind(&input.client_secret)
        .bind(&input.name)
        .bind(&input.description)
        .bind(join_scopes(&input.scopes))
        .bind(input.implicit_allowed)
        .bind(&input.belongs_to_user)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(OAuth2Client {
            id: input.id.clone(),
            client_id: input.client_id.clone(),
            client_secret: input.client_secret.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            scopes: input.scopes.clone(),
            implicit_allowed: input.implicit_allowed,
            belongs_to_user: input.belongs_to_user.clone(),
            created_at,
            archived_at: None,
        })
    }

    async fn get_oauth2_client_by_id(&self, id: &str) -> Result<Option<OAuth2Client>> {
        let row =
            sqlx::query("SELECT * FROM oauth2_clients WHERE id = ?1 AND archived_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(Self::client_from_row).transpose()
    }

    async fn get_oauth2_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<OAuth2Client>> {
        let row = sqlx::query(
            "SELECT * FROM oauth2_clients WHERE client_id = ?1 AND archived_at IS NULL",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::client_from_row).transpose()
    }

    async fn get_oauth2_clients(
        &self,
        belongs_to_user: &str,
        filter: &QueryFilter,
    ) -> Result<Page<OAuth2Client>> {
        let total_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM oauth2_clients WHERE belongs_to_user = ?1 AND archived_at IS NULL",
        )
        .bind(belongs_to_user)
        .fetch_one(&self.pool)
        .await?;

        let page = filter.page();
        let limit = filter.limit();
        let offset = i64::try_from(filter.offset()).unwrap_or(i64::MAX);
        let order = if filter.descending() { "DESC" } else { "ASC" };

        // ids are time-ordered, so ordering by id is creation order
        let query = format!(
            "SELECT * FROM oauth2_clients WHERE belongs_to_user = ?1 AND archived_at IS NULL \
             ORDER BY id {order} LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query(&query)
            .bind(belongs_to_user)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let data = rows
            .iter()
            .map(Self::client_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            data,
            page,
            limit,
            total_count: u64::try_from(total_count).unwrap_or(0),
        })
    }

    async fn archive_oauth2_client(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE oauth2_clients SET archived_at = ?1 WHERE id = ?2 AND archived_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
