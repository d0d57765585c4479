// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: key-source exclusivity, KDF parameter floors, and AES key
//! length.

use crate::diagnostic::ConfigError;
use crate::model::CredvaultConfig;

/// Minimum PBKDF2 iteration count accepted for HMAC-SHA256.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Minimum salt length in bytes.
pub const MIN_SALT_LENGTH: usize = 16;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CredvaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let crypto = &config.crypto;

    // Exactly one key source.
    match (&crypto.passphrase, &crypto.raw_key_hex) {
        (Some(_), Some(_)) => errors.push(ConfigError::validation(
            "crypto: provide exactly one of `passphrase` or `raw_key_hex`, not both",
        )),
        (None, None) => errors.push(ConfigError::validation(
            "crypto: provide exactly one of `passphrase` or `raw_key_hex`",
        )),
        _ => {}
    }

    if crypto.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
        errors.push(ConfigError::validation(format!(
            "crypto.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
            crypto.pbkdf2_iterations
        )));
    }

    if crypto.salt_length < MIN_SALT_LENGTH {
        errors.push(ConfigError::validation(format!(
            "crypto.salt_length must be at least {MIN_SALT_LENGTH} bytes, got {}",
            crypto.salt_length
        )));
    }

    if !matches!(crypto.key_length_bits, 128 | 192 | 256) {
        errors.push(ConfigError::validation(format!(
            "crypto.key_length_bits must be 128, 192, or 256, got {}",
            crypto.key_length_bits
        )));
    }

    if crypto.aad.trim().is_empty() {
        errors.push(ConfigError::validation("crypto.aad must not be empty"));
    }

    // A raw key must decode and match the configured key length.
    if let Some(ref raw_hex) = crypto.raw_key_hex {
        match hex::decode(raw_hex) {
            Ok(bytes) => {
                let expected = (crypto.key_length_bits / 8) as usize;
                if bytes.len() != expected {
                    errors.push(ConfigError::validation(format!(
                        "crypto.raw_key_hex decodes to {} bytes, expected {expected} \
                         for a {}-bit key",
                        bytes.len(),
                        crypto.key_length_bits
                    )));
                }
            }
            Err(e) => errors.push(ConfigError::validation(format!(
                "crypto.raw_key_hex is not valid hex: {e}"
            ))),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CryptoConfig;

    fn base_config() -> CredvaultConfig {
        CredvaultConfig {
            crypto: CryptoConfig {
                passphrase: Some("test passphrase".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn valid_passphrase_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn both_key_sources_rejected() {
        let mut config = base_config();
        config.crypto.raw_key_hex = Some("00".repeat(32));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("not both")));
    }

    #[test]
    fn neither_key_source_rejected() {
        let mut config = base_config();
        config.crypto.passphrase = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn iteration_floor_enforced() {
        let mut config = base_config();
        config.crypto.pbkdf2_iterations = 99_999;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("100000")));
    }

    #[test]
    fn salt_floor_enforced() {
        let mut config = base_config();
        config.crypto.salt_length = 15;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn key_length_must_be_aes_size() {
        let mut config = base_config();
        config.crypto.key_length_bits = 512;
        assert!(validate_config(&config).is_err());

        for bits in [128, 192, 256] {
            config.crypto.key_length_bits = bits;
            assert!(validate_config(&config).is_ok(), "{bits} should be valid");
        }
    }

    #[test]
    fn raw_key_length_must_match_key_bits() {
        let mut config = base_config();
        config.crypto.passphrase = None;
        config.crypto.raw_key_hex = Some("00".repeat(16)); // 128-bit key
        config.crypto.key_length_bits = 256;
        assert!(validate_config(&config).is_err());

        config.crypto.key_length_bits = 128;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn raw_key_must_be_hex() {
        let mut config = base_config();
        config.crypto.passphrase = None;
        config.crypto.raw_key_hex = Some("not hex at all".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = base_config();
        config.crypto.pbkdf2_iterations = 1;
        config.crypto.salt_length = 1;
        config.crypto.aad = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
