// ABOUTME: Authentication primitives: password hashing, TOTP validation, entropy policy, QR rendering
// ABOUTME: Everything that inspects or produces user credentials lives under this module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

pub mod password;
pub mod password_policy;
pub mod qr;
pub mod totp;

pub use password::Authenticator;
pub use password_policy::validate_password_entropy;
pub use qr::build_qr_code;
