// ABOUTME: Authenticator-enrollment QR code rendering
// ABOUTME: Encodes the otpauth:// provisioning URI as a 256x256 base64 PNG data URI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use base64::{engine::general_purpose, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageOutputFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// Issuer label embedded in provisioning URIs
pub const TOTP_ISSUER: &str = "Mealtime";

// Kept verbatim from the data consumed by existing clients; the payload is
// PNG regardless of what the prefix claims.
const BASE64_IMAGE_PREFIX: &str = "data:image/jpeg;base64,";

const QR_CODE_EDGE: u32 = 256;

/// Build the `otpauth://` provisioning URI for a username and seed.
#[must_use]
pub fn build_otpauth_uri(username: &str, two_factor_secret: &str) -> String {
    format!("otpauth://totp/{TOTP_ISSUER}:{username}?secret={two_factor_secret}&issuer={TOTP_ISSUER}")
}

/// Render the provisioning QR code for a username and seed as a base64 data
/// URI. Rendering failures are logged and produce an empty string; the
/// enrollment flow still works from the raw seed.
#[must_use]
pub fn build_qr_code(username: &str, two_factor_secret: &str) -> String {
    let uri = build_otpauth_uri(username, two_factor_secret);

    let code = match QrCode::new(uri.as_bytes()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "encoding otpauth URI as QR code failed");
            return String::new();
        }
    };

    let rendered = code.render::<Luma<u8>>().build();
    let scaled = DynamicImage::ImageLuma8(rendered).resize_exact(
        QR_CODE_EDGE,
        QR_CODE_EDGE,
        FilterType::Nearest,
    );

    let mut buffer = Cursor::new(Vec::new());
    if let Err(e) = scaled.write_to(&mut buffer, ImageOutputFormat::Png) {
        tracing::error!(error = %e, "encoding QR code to PNG failed");
        return String::new();
    }

    format!(
        "{BASE64_IMAGE_PREFIX}{}",
        general_purpose::STANDARD.encode(buffer.get_ref())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    #[test]
    fn test_otpauth_uri_shape() {
        let uri = build_otpauth_uri("ada", "SEEDSEEDSEED");
        assert_eq!(
            uri,
            "otpauth://totp/Mealtime:ada?secret=SEEDSEEDSEED&issuer=Mealtime"
        );
    }

    #[test]
    fn test_qr_code_is_a_png_data_uri() {
        let encoded = build_qr_code("ada", "SEEDSEEDSEEDSEEDSEEDSEED");
        assert!(encoded.starts_with("data:image/jpeg;base64,"));

        let payload = encoded.trim_start_matches("data:image/jpeg;base64,");
        let bytes = general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_qr_codes_differ_per_seed() {
        let a = build_qr_code("ada", "SEEDAAAA");
        let b = build_qr_code("ada", "SEEDBBBB");
        assert_ne!(a, b);
    }
}
