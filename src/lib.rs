// ABOUTME: Mealtime server library root
// ABOUTME: OAuth2 client lifecycle, user registration with TOTP enrollment, request authentication
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

//! # Mealtime Server
//!
//! Backend core for the Mealtime meal-planning service: user registration
//! with mandatory TOTP enrollment, OAuth2 client provisioning and the
//! client-credentials grant, bearer and cookie session extraction, and
//! best-effort change-event publication.
//!
//! ## Architecture
//!
//! - [`crypto`] generates every credential from the OS CSPRNG
//! - [`auth`] hashes passwords, validates TOTP codes, and renders QR codes
//! - [`database_plugins`] abstracts the credential store (SQLite or memory)
//! - [`oauth2_server`] issues and validates bearer tokens
//! - [`session`] turns request credentials into a per-request context
//! - [`routes`] exposes the HTTP surface
//! - [`events`] fans out best-effort change announcements

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod database_plugins;
pub mod errors;
pub mod events;
pub mod logging;
pub mod models;
pub mod oauth2_server;
pub mod resources;
pub mod routes;
pub mod session;
