// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Maps Figment deserialization errors onto miette diagnostics. Unknown
//! keys get a "did you mean?" hint via Jaro-Winkler string similarity.

use miette::Diagnostic;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity to offer a hint.
/// 0.75 catches common typos like `passfrase` -> `passphrase` while
/// filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with diagnostic context.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(credvault::config::unknown_key), help("{hint}"))]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Suggested correction plus the valid keys for the section.
        hint: String,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(credvault::config::invalid_type))]
    InvalidType {
        /// The key with the wrong type.
        key: String,
        /// Description of the type mismatch.
        detail: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(credvault::config::missing_key),
        help("add `{key} = <value>` to your credvault.toml")
    )]
    MissingKey {
        /// The missing key name.
        key: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(credvault::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(credvault::config::other))]
    Other(String),
}

impl ConfigError {
    /// A semantic validation failure, used by post-deserialization checks.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    fn unknown_key(field: &str, valid_keys: &[&str]) -> Self {
        let listing = valid_keys.join(", ");
        let hint = match suggest_key(field, valid_keys) {
            Some(s) => format!("did you mean `{s}`? Valid keys: {listing}"),
            None => format!("valid keys: {listing}"),
        };
        Self::UnknownKey {
            key: field.to_string(),
            hint,
        }
    }

    /// Convert a `figment::Error` into one diagnostic per underlying error.
    ///
    /// A figment error may aggregate several failures; each becomes its own
    /// `ConfigError`, with fuzzy hints for unknown field errors.
    pub fn from_figment(err: figment::Error) -> Vec<Self> {
        use figment::error::Kind;

        err.into_iter()
            .map(|error| match &error.kind {
                Kind::UnknownField(field, expected) => Self::unknown_key(field, expected),
                Kind::MissingField(field) => Self::MissingKey {
                    key: field.clone().into_owned(),
                },
                Kind::InvalidType(actual, expected) => Self::InvalidType {
                    key: error
                        .path
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join("."),
                    detail: format!("found {actual}, expected {expected}"),
                },
                _ => Self::Other(format!("{error}")),
            })
            .collect()
    }
}

/// Best valid key above the similarity threshold, or `None` when nothing
/// is close enough to the unknown key.
fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}
