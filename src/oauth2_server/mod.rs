// ABOUTME: OAuth2 authorization server for machine clients
// ABOUTME: Client-credentials grant, bearer validation, and path-derived scope enforcement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

//! # OAuth2 Authorization Server
//!
//! Issues bearer tokens to provisioned API clients through the
//! client-credentials grant and validates those tokens on incoming
//! requests. Tokens are process-local (see [`token_store`]); validation
//! always re-reads the client row, so archiving a client revokes its
//! access immediately.

pub mod endpoints;
pub mod models;
pub mod scope;
pub mod token_store;

pub use endpoints::AuthorizationServer;
pub use models::{OAuth2Error, Token, TokenRequest, TokenResponse};
pub use token_store::TokenStore;
