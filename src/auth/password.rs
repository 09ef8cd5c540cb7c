// ABOUTME: Argon2id password hashing and combined credential validation
// ABOUTME: Verifies (hashed_password, plaintext, totp_seed, totp_code) tuples for login and credential changes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use crate::auth::totp;

/// Validator-level failure: the inputs could not be checked at all.
///
/// Distinct from a clean mismatch, which is reported as `Ok(false)`. The
/// HTTP layer maps errors to 400 and clean mismatches to 401.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error(transparent)]
    MalformedSeed(#[from] totp::TotpError),
    #[error("password hashing failed")]
    Hashing,
}

/// Password hasher and credential validator.
///
/// Hashing is deliberately CPU-bound; callers treat `hash_password` and
/// `credentials_are_valid` as suspension points.
#[derive(Clone, Default)]
pub struct Authenticator {
    argon2: Argon2<'static>,
}

impl Authenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a plaintext password with Argon2id and a fresh random salt.
    ///
    /// # Errors
    /// Returns [`CredentialError::Hashing`] when argon2 fails.
    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!(error = %e, "argon2 password hashing failed");
                CredentialError::Hashing
            })?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// # Errors
    /// Returns [`CredentialError::MalformedHash`] when the stored hash does not parse.
    pub fn password_matches(
        &self,
        hashed_password: &str,
        password: &str,
    ) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hashed_password).map_err(|e| {
            tracing::error!(error = %e, "stored password hash failed to parse");
            CredentialError::MalformedHash
        })?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Verify a full credential tuple.
    ///
    /// When `totp_seed` is empty the TOTP leg is skipped (an account whose
    /// enrollment is still pending authenticates by password alone).
    /// A clean mismatch of either leg is `Ok(false)`.
    ///
    /// # Errors
    /// Returns a [`CredentialError`] when the hash or seed cannot be interpreted.
    pub fn credentials_are_valid(
        &self,
        hashed_password: &str,
        password: &str,
        totp_seed: &str,
        totp_code: &str,
    ) -> Result<bool, CredentialError> {
        let password_ok = self.password_matches(hashed_password, password)?;

        if totp_seed.is_empty() {
            return Ok(password_ok);
        }

        let totp_ok = totp::validate_code(totp_seed, totp_code)?;
        Ok(password_ok && totp_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_encoding::BASE32;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let authenticator = Authenticator::new();
        let hash = authenticator.hash_password("hunter2hunter2").unwrap();
        assert!(authenticator
            .password_matches(&hash, "hunter2hunter2")
            .unwrap());
        assert!(!authenticator.password_matches(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let authenticator = Authenticator::new();
        let a = authenticator.hash_password("same-password").unwrap();
        let b = authenticator.hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_credentials_with_totp() {
        let authenticator = Authenticator::new();
        let hash = authenticator.hash_password("hunter2hunter2").unwrap();
        let seed = BASE32.encode(b"12345678901234567890");
        let code = totp::generate_code(&seed).unwrap();

        assert!(authenticator
            .credentials_are_valid(&hash, "hunter2hunter2", &seed, &code)
            .unwrap());
        assert!(!authenticator
            .credentials_are_valid(&hash, "wrong-password", &seed, &code)
            .unwrap());
        assert!(!authenticator
            .credentials_are_valid(&hash, "hunter2hunter2", &seed, "000000")
            .unwrap());
    }

    #[test]
    fn test_empty_seed_skips_totp_leg() {
        let authenticator = Authenticator::new();
        let hash = authenticator.hash_password("hunter2hunter2").unwrap();
        assert!(authenticator
            .credentials_are_valid(&hash, "hunter2hunter2", "", "")
            .unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error_not_a_mismatch() {
        let authenticator = Authenticator::new();
        assert!(matches!(
            authenticator.password_matches("not-a-phc-string", "x"),
            Err(CredentialError::MalformedHash)
        ));
    }
}
