// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the credvault secrets store.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level credvault configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values,
/// except that `crypto` needs exactly one key source before the engine can
/// be built (enforced by validation, not deserialization).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredvaultConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cipher engine and envelope settings.
    #[serde(default)]
    pub crypto: CryptoConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("credvault").join("credvault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("credvault.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Cipher engine configuration.
///
/// Exactly one of `passphrase` / `raw_key_hex` must be set: the former
/// selects PBKDF2-derived keys (a fresh salt per encryption), the latter a
/// pre-existing AES key supplied as hex. PBKDF2 parameter floors follow
/// OWASP guidance for HMAC-SHA256.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoConfig {
    /// Passphrase for PBKDF2-derived keys. Mutually exclusive with
    /// `raw_key_hex`.
    #[serde(default)]
    pub passphrase: Option<String>,

    /// Hex-encoded raw AES key. Mutually exclusive with `passphrase`.
    /// Must decode to exactly `key_length_bits / 8` bytes.
    #[serde(default)]
    pub raw_key_hex: Option<String>,

    /// PBKDF2-HMAC-SHA256 iteration count (default: 210,000; floor 100,000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Salt length in bytes for PBKDF2 (default: 16; floor 16).
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,

    /// Derived/raw AES key length in bits: 128, 192, or 256.
    #[serde(default = "default_key_length_bits")]
    pub key_length_bits: u32,

    /// Fixed associated-authenticated-data string bound into every
    /// encryption. Identifies the deployment; never secret.
    #[serde(default = "default_aad")]
    pub aad: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            passphrase: None,
            raw_key_hex: None,
            pbkdf2_iterations: default_pbkdf2_iterations(),
            salt_length: default_salt_length(),
            key_length_bits: default_key_length_bits(),
            aad: default_aad(),
        }
    }
}

fn default_pbkdf2_iterations() -> u32 {
    210_000
}

fn default_salt_length() -> usize {
    16
}

fn default_key_length_bits() -> u32 {
    256
}

fn default_aad() -> String {
    "credvault".to_string()
}
