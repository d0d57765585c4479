// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! Timestamps are ISO-8601 TEXT columns written by SQLite itself
//! (`strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`). Envelope fields are opaque
//! here; the crypto layer owns their interpretation.

/// A persisted cipher envelope, stored column-per-field so corrupt rows are
/// visible in plain SQL tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeRow {
    /// Envelope format version tag, e.g. `"v1"`.
    pub version: String,
    /// Key-derivation mode tag, e.g. `"pbkdf2"` or `"raw"`.
    pub kdf: String,
    /// PBKDF2 iteration count; absent in raw-key mode.
    pub iterations: Option<u32>,
    /// Per-encryption salt; absent in raw-key mode.
    pub salt: Option<Vec<u8>>,
    /// AES-GCM nonce (12 bytes).
    pub nonce: Vec<u8>,
    /// Ciphertext including the GCM authentication tag.
    pub ciphertext: Vec<u8>,
}

/// One node of a credential version chain.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: i64,
    /// Successor node, or `None` if this is the latest version.
    pub next_id: Option<i64>,
    pub envelope_id: i64,
    pub app: String,
    pub environment: String,
    pub credential_type: String,
    pub username: String,
    /// Monotonic version number, 1 for the chain head.
    pub version: i64,
    pub enabled: bool,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

/// Fields for creating the first version of a credential chain.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub app: String,
    pub environment: String,
    pub credential_type: String,
    pub username: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub envelope: EnvelopeRow,
}

/// Fields for superseding a credential with a new version.
///
/// The username is copied from the superseded node, never supplied here.
#[derive(Debug, Clone)]
pub struct CredentialUpdate {
    pub app: String,
    pub environment: String,
    pub credential_type: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub envelope: EnvelopeRow,
}

/// Result of a supersede attempt, resolved inside a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupersedeOutcome {
    /// A new version was appended; carries the new node's ID.
    Superseded(i64),
    /// The target node already has a successor, or lost the append race.
    NotLatest,
    /// No credential with the given ID exists.
    NotFound,
}

/// A stored API key record.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: i64,
    pub envelope_id: i64,
    pub app: String,
    pub environment: String,
    pub client_id: String,
    /// Optional host restriction for authentication.
    pub server: Option<String>,
    pub updated_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for creating a new API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub app: String,
    pub environment: String,
    pub client_id: String,
    pub server: Option<String>,
    pub updated_by: String,
    pub envelope: EnvelopeRow,
}

/// Fields for updating an existing API key.
///
/// `client_id` is immutable after creation. A `None` envelope keeps the
/// stored secret unchanged.
#[derive(Debug, Clone)]
pub struct ApiKeyUpdate {
    pub app: String,
    pub environment: String,
    pub server: Option<String>,
    pub updated_by: String,
    pub envelope: Option<EnvelopeRow>,
}
