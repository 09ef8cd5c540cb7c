// ABOUTME: Server configuration module
// ABOUTME: Environment-driven settings for HTTP, database, sessions, and registration policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

pub mod environment;

pub use environment::{LogFormat, ServerConfig};
