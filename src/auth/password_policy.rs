// ABOUTME: Password entropy estimation and minimum-strength enforcement
// ABOUTME: Charset-size-times-length model with repeat and sequence degradation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use crate::errors::{AppError, AppResult};

/// Default minimum entropy in bits for new passwords
pub const DEFAULT_MINIMUM_ENTROPY: f64 = 75.0;

const SPECIAL_CHARSET_SIZE: f64 = 32.0;

/// Estimate the entropy of a password in bits.
///
/// The estimate is `effective_length * log2(charset_size)` where the charset
/// size is the union of the character classes present and the effective
/// length discounts the third and later characters of any consecutive repeat
/// or straight ascending/descending run ("aaaa" and "abcd" are both cheap
/// for an attacker).
#[must_use]
pub fn estimate_entropy(password: &str) -> f64 {
    let chars: Vec<char> = password.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }

    let mut charset_size = 0.0;
    if chars.iter().any(char::is_ascii_lowercase) {
        charset_size += 26.0;
    }
    if chars.iter().any(char::is_ascii_uppercase) {
        charset_size += 26.0;
    }
    if chars.iter().any(char::is_ascii_digit) {
        charset_size += 10.0;
    }
    if chars
        .iter()
        .any(|c| !c.is_ascii_alphanumeric())
    {
        charset_size += SPECIAL_CHARSET_SIZE;
    }

    let mut effective_length = 0.0_f64;
    for (i, c) in chars.iter().enumerate() {
        if i >= 2 {
            let a = chars[i - 2] as i64;
            let b = chars[i - 1] as i64;
            let current = *c as i64;
            let repeat = a == b && b == current;
            let run = (current - b == b - a) && (current - b).abs() == 1;
            if repeat || run {
                // discounted but not free
                effective_length += 0.5;
                continue;
            }
        }
        effective_length += 1.0;
    }

    effective_length * charset_size.log2()
}

/// Enforce the configured minimum entropy for a new password.
///
/// # Errors
/// Returns `InvalidInput` when the password is too weak.
pub fn validate_password_entropy(password: &str, minimum_entropy: f64) -> AppResult<()> {
    let entropy = estimate_entropy(password);
    if entropy < minimum_entropy {
        tracing::debug!(
            entropy_bits = entropy,
            required_bits = minimum_entropy,
            "weak password rejected"
        );
        return Err(AppError::invalid_input("password too weak"));
    }
    Ok(())
}
