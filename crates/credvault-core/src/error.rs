// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the credvault secrets store.

use thiserror::Error;

/// The primary error type used across all credvault crates.
///
/// Nothing here is retried internally; every variant propagates to the
/// caller, which owns retry/backoff policy.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Invalid or contradictory configuration (both or neither key source,
    /// out-of-range KDF parameters). Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed envelope data: wrong field count, unknown mode tag, bad
    /// base64, or a column that violates the envelope invariants.
    #[error("invalid envelope: {0}")]
    Format(String),

    /// Any cryptographic failure: tag mismatch, AAD mismatch, or a KDF-mode
    /// mismatch between engine and envelope.
    ///
    /// Intentionally carries no detail. Callers (and anything observing
    /// them) must not be able to distinguish *why* decryption failed.
    #[error("crypto operation failed")]
    Crypto,

    /// Supersede was attempted on a credential that already has a successor.
    #[error("cannot supersede an old credential version")]
    NotLatest,

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
