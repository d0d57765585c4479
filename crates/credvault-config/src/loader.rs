// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./credvault.toml` > `~/.config/credvault/credvault.toml`
//! > `/etc/credvault/credvault.toml` with environment variable overrides via
//! `CREDVAULT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CredvaultConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/credvault/credvault.toml` (system-wide)
/// 3. `~/.config/credvault/credvault.toml` (user XDG config)
/// 4. `./credvault.toml` (local directory)
/// 5. `CREDVAULT_*` environment variables
pub fn load_config() -> Result<CredvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CredvaultConfig::default()))
        .merge(Toml::file("/etc/credvault/credvault.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("credvault/credvault.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("credvault.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CredvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CredvaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CredvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CredvaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CREDVAULT_CRYPTO_RAW_KEY_HEX` must map
/// to `crypto.raw_key_hex`, not `crypto.raw.key.hex`.
fn env_provider() -> Env {
    Env::prefixed("CREDVAULT_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CREDVAULT_CRYPTO_AAD -> "crypto_aad"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("crypto_", "crypto.", 1);
        mapped.into()
    })
}
