// ABOUTME: Cryptographic primitives for the Mealtime server
// ABOUTME: Houses the OS-CSPRNG-backed secret generator used for all credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

pub mod secrets;

pub use secrets::{SecretGenerationError, SecretGenerator};
