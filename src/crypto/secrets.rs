// ABOUTME: Cryptographically random secret generation for client ids, secrets, and TOTP seeds
// ABOUTME: Produces hex and base32 strings from the OS-grade CSPRNG
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use data_encoding::BASE32;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// Failure to read entropy from the system RNG
#[derive(Debug, Error)]
#[error("system RNG failure: could not generate a secure random value")]
pub struct SecretGenerationError;

/// Source of cryptographically random credential material.
///
/// Every client id, client secret, access token, and TOTP seed in the system
/// comes from here. Two successive calls differ with overwhelming
/// probability; entropy failure is surfaced, never papered over.
#[derive(Clone)]
pub struct SecretGenerator {
    rng: SystemRandom,
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn random_bytes(&self, length: usize) -> Result<Vec<u8>, SecretGenerationError> {
        let mut bytes = vec![0_u8; length];
        self.rng.fill(&mut bytes).map_err(|_| {
            tracing::error!("system RNG failure while generating secret material");
            SecretGenerationError
        })?;
        Ok(bytes)
    }

    /// Generate `length` random octets, hex-encoded (`2 * length` characters).
    ///
    /// # Errors
    /// Returns [`SecretGenerationError`] when the system RNG fails.
    pub fn hex_string(&self, length: usize) -> Result<String, SecretGenerationError> {
        Ok(hex::encode(self.random_bytes(length)?))
    }

    /// Generate `length` random octets, base32-encoded with the standard
    /// alphabet (padded, matching `encoding/base32` in the reference data).
    ///
    /// # Errors
    /// Returns [`SecretGenerationError`] when the system RNG fails.
    pub fn base32_string(&self, length: usize) -> Result<String, SecretGenerationError> {
        Ok(BASE32.encode(&self.random_bytes(length)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_string_shape() {
        let generator = SecretGenerator::new();
        let value = generator.hex_string(16).unwrap();
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_base32_string_decodes_to_requested_octets() {
        let generator = SecretGenerator::new();
        let value = generator.base32_string(64).unwrap();
        // 64 octets pad out to 104 base32 characters
        assert_eq!(value.len(), 104);
        let decoded = BASE32.decode(value.as_bytes()).unwrap();
        assert_eq!(decoded.len(), 64);
    }

    #[test]
    fn test_successive_values_differ() {
        let generator = SecretGenerator::new();
        let a = generator.hex_string(16).unwrap();
        let b = generator.hex_string(16).unwrap();
        assert_ne!(a, b);

        let c = generator.base32_string(64).unwrap();
        let d = generator.base32_string(64).unwrap();
        assert_ne!(c, d);
    }
}
