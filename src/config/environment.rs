// ABOUTME: Environment-variable configuration loading
// ABOUTME: Every setting has a development default; production overrides via env
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::auth::password_policy::DEFAULT_MINIMUM_ENTROPY;
use crate::crypto::SecretGenerator;

/// Output format for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Error)]
#[error("unknown log format {0:?} (expected pretty or json)")]
pub struct ParseLogFormatError(String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ParseLogFormatError(other.to_owned())),
        }
    }
}

/// Server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP listener
    pub http_port: u16,
    /// Credential store URL (`sqlite:...` or `memory:`)
    pub database_url: String,
    /// Key for signing session cookies, hex-encoded
    pub cookie_signing_key: String,
    /// Whether `POST /users/` accepts new registrations
    pub signups_enabled: bool,
    /// Minimum username length in characters
    pub min_username_length: usize,
    /// Minimum password length in characters
    pub min_password_length: usize,
    /// Minimum estimated password entropy in bits
    pub minimum_password_entropy: f64,
    /// Bearer token lifetime in seconds
    pub token_lifetime_seconds: i64,
    /// Session cookie lifetime in seconds
    pub cookie_lifetime_seconds: i64,
    /// Log output format
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error when a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        let cookie_signing_key = match env::var("COOKIE_SIGNING_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                // Ephemeral key: sessions will not survive a restart
                tracing::warn!(
                    "COOKIE_SIGNING_KEY is not set; generated an ephemeral session signing key"
                );
                SecretGenerator::new()
                    .hex_string(32)
                    .context("failed to generate an ephemeral cookie signing key")?
            }
        };

        Ok(Self {
            http_port: env_parse("HTTP_PORT", 8080)?,
            database_url: env_string("DATABASE_URL", "sqlite:./data/mealtime.db"),
            cookie_signing_key,
            signups_enabled: env_parse("SIGNUPS_ENABLED", true)?,
            min_username_length: env_parse("MIN_USERNAME_LENGTH", 3)?,
            min_password_length: env_parse("MIN_PASSWORD_LENGTH", 8)?,
            minimum_password_entropy: env_parse(
                "MINIMUM_PASSWORD_ENTROPY",
                DEFAULT_MINIMUM_ENTROPY,
            )?,
            token_lifetime_seconds: env_parse("TOKEN_LIFETIME_SECONDS", 3600)?,
            cookie_lifetime_seconds: env_parse("COOKIE_LIFETIME_SECONDS", 86_400)?,
            log_format: env_parse("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    /// Raw bytes of the cookie signing key.
    #[must_use]
    pub fn cookie_signing_key_bytes(&self) -> Vec<u8> {
        // Accept both hex-encoded and raw keys
        hex::decode(&self.cookie_signing_key)
            .unwrap_or_else(|_| self.cookie_signing_key.clone().into_bytes())
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid value for {key}: {value:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_load_without_environment() {
        for key in [
            "HTTP_PORT",
            "DATABASE_URL",
            "COOKIE_SIGNING_KEY",
            "SIGNUPS_ENABLED",
            "LOG_FORMAT",
        ] {
            env::remove_var(key);
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(config.signups_enabled);
        assert_eq!(config.min_password_length, 8);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.cookie_signing_key.is_empty());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        env::set_var("HTTP_PORT", "9090");
        env::set_var("SIGNUPS_ENABLED", "false");
        env::set_var("LOG_FORMAT", "json");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, 9090);
        assert!(!config.signups_enabled);
        assert_eq!(config.log_format, LogFormat::Json);

        env::remove_var("HTTP_PORT");
        env::remove_var("SIGNUPS_ENABLED");
        env::remove_var("LOG_FORMAT");
    }

    #[test]
    #[serial]
    fn test_malformed_value_is_an_error() {
        env::set_var("HTTP_PORT", "not-a-port");
        assert!(ServerConfig::from_env().is_err());
        env::remove_var("HTTP_PORT");
    }

    #[test]
    fn test_hex_key_decodes_to_raw_bytes() {
        let config = ServerConfig {
            http_port: 0,
            database_url: "memory:".into(),
            cookie_signing_key: "00ff".into(),
            signups_enabled: true,
            min_username_length: 3,
            min_password_length: 8,
            minimum_password_entropy: DEFAULT_MINIMUM_ENTROPY,
            token_lifetime_seconds: 3600,
            cookie_lifetime_seconds: 86_400,
            log_format: LogFormat::Pretty,
        };
        assert_eq!(config.cookie_signing_key_bytes(), vec![0x00, 0xff]);
    }
}
