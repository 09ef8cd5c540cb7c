// ABOUTME: Core data models for the Mealtime authentication and OAuth2 subsystem
// ABOUTME: Defines User, OAuth2Client, session context, and request/response types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

//! # Data Models
//!
//! Core data structures shared across the server: the credential-store
//! entities ([`User`], [`OAuth2Client`]), the per-request
//! [`SessionContextData`], and the request/response payloads for the user
//! and client-management surfaces.
//!
//! The internal database id of an OAuth2 client (the one used in URLs) and
//! its public `client_id` (the OAuth2 handle) are deliberately kept as
//! separate fields; conflating them is a recurring defect.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Generate a fresh, time-ordered opaque identifier.
///
/// UUIDv7 keeps ids sortable by creation time, which the store relies on
/// for stable default ordering.
#[must_use]
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// A registered user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier, time-ordered
    pub id: String,
    /// Unique username, case-sensitive after trimming
    pub username: String,
    /// Unique email address, lowercased at registration
    pub email_address: String,
    /// First name, optional demographic field
    pub first_name: Option<String>,
    /// Last name, optional demographic field
    pub last_name: Option<String>,
    /// Birthday, optional demographic field
    pub birthday: Option<NaiveDate>,
    /// Argon2 hash of the password; never exported
    #[serde(skip_serializing)]
    pub hashed_password: String,
    /// Base32-encoded TOTP seed (64 octets); never empty for an active account
    #[serde(skip_serializing)]
    pub two_factor_secret: String,
    /// When the TOTP seed was verified; `None` means enrollment is pending
    pub two_factor_secret_verified_at: Option<DateTime<Utc>>,
    /// Reference to an external avatar blob
    pub avatar_src: Option<String>,
    /// Household the user lands in by default
    pub default_household_id: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was archived; archived accounts are invisible
    pub archived_at: Option<DateTime<Utc>>,
}

/// A pending invitation into an existing household.
///
/// Registration only ever reads these; issuing and revoking invitations is
/// handled elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdInvitation {
    pub id: String,
    /// Bearer token mailed to the invitee; presented back at registration
    #[serde(skip_serializing)]
    pub token: String,
    /// Household the invitee lands in instead of a fresh default
    pub destination_household: String,
    pub created_at: DateTime<Utc>,
}

/// A provisioned OAuth2 API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Client {
    /// Opaque internal identifier; this is the id used in URLs
    pub id: String,
    /// Public OAuth2 handle: 16 random octets, hex-encoded (32 chars)
    pub client_id: String,
    /// Client secret as issued; compared in constant time, elided from reads
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Scope tokens this client may be granted; immutable after creation
    pub scopes: Vec<String>,
    /// Whether the implicit grant is allowed for this client
    pub implicit_allowed: bool,
    /// The user that provisioned this client
    pub belongs_to_user: String,
    /// When the client was created
    pub created_at: DateTime<Utc>,
    /// When the client was archived; archived clients never authenticate
    pub archived_at: Option<DateTime<Utc>>,
}

impl OAuth2Client {
    /// Whether the given scope token was granted to this client.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        !scope.is_empty() && self.scopes.iter().any(|s| s == scope)
    }
}

/// Identity of the requester attached to a session context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequesterInfo {
    /// The authenticated user's id
    pub user_id: String,
    /// Permission tokens per household the user belongs to
    pub permissions_by_household: HashMap<String, Vec<String>>,
}

/// Per-request session context; built by the extractor, never stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContextData {
    /// Who is making the request
    pub requester: RequesterInfo,
    /// The household the request operates on
    pub active_household_id: String,
}

impl SessionContextData {
    /// Build the context a freshly authenticated user gets by default.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        let mut permissions = HashMap::new();
        permissions.insert(
            user.default_household_id.clone(),
            vec!["household_member".to_owned()],
        );
        Self {
            requester: RequesterInfo {
                user_id: user.id.clone(),
                permissions_by_household: permissions,
            },
            active_household_id: user.default_household_id.clone(),
        }
    }
}

/// Pagination and sorting parameters shared by list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFilter {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// `asc` or `desc` by creation time
    pub sort_by: Option<String>,
}

impl QueryFilter {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 250;

    /// Effective page, clamped to at least 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective limit, clamped to the maximum page size.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// Row offset for the effective page. Widened to `u64` so an
    /// arbitrarily large `page` cannot overflow.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    /// Whether results sort descending by creation time.
    #[must_use]
    pub fn descending(&self) -> bool {
        matches!(self.sort_by.as_deref(), Some("desc"))
    }
}

/// One page of results from a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
}

// ================================
// User surface payloads
// ================================

/// Registration request body for `POST /users/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegistrationInput {
    pub username: String,
    pub email_address: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub invitation_id: Option<String>,
    #[serde(default)]
    pub invitation_token: Option<String>,
}

impl UserRegistrationInput {
    /// Validate field lengths against the configured minimums.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the username or password is too short.
    pub fn validate(&self, min_username_length: usize, min_password_length: usize) -> AppResult<()> {
        if self.username.trim().chars().count() < min_username_length {
            return Err(AppError::invalid_input(format!(
                "username must be at least {min_username_length} characters"
            )));
        }
        if self.password.trim().chars().count() < min_password_length {
            return Err(AppError::invalid_input(format!(
                "password must be at least {min_password_length} characters"
            )));
        }
        if self.email_address.trim().is_empty() {
            return Err(AppError::invalid_input("email address is required"));
        }
        Ok(())
    }
}

/// Materialized user record handed to the credential store
#[derive(Debug, Clone)]
pub struct UserDatabaseCreationInput {
    pub id: String,
    pub username: String,
    pub email_address: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub hashed_password: String,
    pub two_factor_secret: String,
    pub default_household_id: String,
}

/// One-time response carrying the fresh TOTP seed and its QR code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreationResponse {
    pub created_user_id: String,
    pub username: String,
    pub email_address: String,
    pub created_at: DateTime<Utc>,
    pub two_factor_secret: String,
    pub two_factor_qr_code: String,
}

/// Body for `POST /users/totp_secret/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TOTPSecretVerificationInput {
    pub user_id: String,
    pub totp_token: String,
}

impl TOTPSecretVerificationInput {
    /// # Errors
    /// Returns `InvalidInput` when a field is missing or the code is not 6 digits.
    pub fn validate(&self) -> AppResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::invalid_input("user_id is required"));
        }
        if self.totp_token.len() != 6 || !self.totp_token.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::invalid_input("totp_token must be 6 digits"));
        }
        Ok(())
    }
}

/// Body for `POST /api/v1/users/totp_secret/new`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TOTPSecretRefreshInput {
    pub current_password: String,
    pub totp_token: String,
}

/// Response carrying a rotated TOTP seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TOTPSecretRefreshResponse {
    pub two_factor_secret: String,
    pub two_factor_qr_code: String,
}

/// Body for `PUT /api/v1/users/password/new`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordUpdateInput {
    pub current_password: String,
    pub new_password: String,
    pub totp_token: String,
}

/// Body for `POST /api/v1/users/avatar/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUpdateInput {
    pub base64_encoded_data: String,
}

/// Body for `POST /users/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginInput {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub totp_token: Option<String>,
}

// ================================
// OAuth2 client management payloads
// ================================

/// Body for `POST /api/v1/oauth2_clients/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2ClientCreationRequestInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub implicit_allowed: bool,
}

impl OAuth2ClientCreationRequestInput {
    /// Validate the creation request: non-empty name, lowercase scope tokens.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the name is empty or a scope token is malformed.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid_input("client name is required"));
        }
        for scope in &self.scopes {
            let well_formed = !scope.is_empty()
                && scope
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !well_formed {
                return Err(AppError::invalid_input(format!(
                    "scope {scope:?} must be a lowercase token without whitespace"
                )));
            }
        }
        Ok(())
    }
}

/// Materialized client record handed to the credential store
#[derive(Debug, Clone)]
pub struct OAuth2ClientDatabaseCreationInput {
    pub id: String,
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub description: String,
    pub scopes: Vec<String>,
    pub implicit_allowed: bool,
    pub belongs_to_user: String,
}

/// Creation response: the only moment the secret is disclosed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2ClientCreationResponse {
    pub id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_sortable_and_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(a <= b, "v7 ids should be time-ordered");
    }

    #[test]
    fn test_client_scope_membership() {
        let client = OAuth2Client {
            id: new_id(),
            client_id: "c".repeat(32),
            client_secret: "s".repeat(32),
            name: "cli".into(),
            description: String::new(),
            scopes: vec!["household".into(), "meal_plans".into()],
            implicit_allowed: false,
            belongs_to_user: new_id(),
            created_at: Utc::now(),
            archived_at: None,
        };
        assert!(client.has_scope("household"));
        assert!(!client.has_scope("admin"));
        assert!(!client.has_scope(""));
    }

    #[test]
    fn test_registration_input_validation() {
        let input = UserRegistrationInput {
            username: "ada".into(),
            email_address: "ada@x.test".into(),
            password: "correct-horse-battery-staple-42".into(),
            first_name: None,
            last_name: None,
            birthday: None,
            invitation_id: None,
            invitation_token: None,
        };
        assert!(input.validate(3, 8).is_ok());
        assert!(input.validate(4, 8).is_err());

        let weak = UserRegistrationInput {
            password: "a".into(),
            ..input
        };
        assert!(weak.validate(3, 8).is_err());
    }

    #[test]
    fn test_client_creation_scope_validation() {
        let mut input = OAuth2ClientCreationRequestInput {
            name: "cli".into(),
            description: String::new(),
            scopes: vec!["household".into()],
            implicit_allowed: false,
        };
        assert!(input.validate().is_ok());

        input.scopes = vec!["House Hold".into()];
        assert!(input.validate().is_err());

        input.scopes = vec![String::new()];
        assert!(input.validate().is_err());

        input.scopes = vec!["ok".into()];
        input.name = "  ".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_query_filter_clamping() {
        let filter = QueryFilter {
            page: Some(0),
            limit: Some(100_000),
            sort_by: Some("desc".into()),
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), QueryFilter::MAX_LIMIT);
        assert!(filter.descending());
    }

    #[test]
    fn test_query_filter_offset_never_overflows() {
        let filter = QueryFilter {
            page: Some(u32::MAX),
            limit: Some(QueryFilter::MAX_LIMIT),
            sort_by: None,
        };
        assert_eq!(
            filter.offset(),
            u64::from(u32::MAX - 1) * u64::from(QueryFilter::MAX_LIMIT)
        );

        let filter = QueryFilter {
            page: Some(3),
            limit: Some(20),
            sort_by: None,
        };
        assert_eq!(filter.offset(), 40);
    }
}
