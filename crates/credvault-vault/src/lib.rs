// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-GCM cipher envelopes and secret lifecycle services.
//!
//! Every stored secret lives inside a self-describing cipher envelope:
//! the envelope records the key-derivation mode and, in PBKDF2 mode, the
//! salt and iteration count used for that one encryption. Decryption needs
//! only the envelope and the configured passphrase or raw key.
//!
//! On top of the envelope codec sit two lifecycle services: versioned
//! credential chains (append-only, soft-disable) and API keys (mutable,
//! hard-delete, with a constant-time authentication check).

pub mod apikeys;
pub mod credentials;
pub mod engine;
pub mod envelope;
pub mod kdf;
pub mod vault;

pub use apikeys::{ApiKeyService, ApiKeyUpdateRequest, ApiKeyView, AuthOutcome, NewApiKeyRequest};
pub use credentials::{CredentialRequest, CredentialService, CredentialView};
pub use engine::{CryptoEngine, EngineConfig};
pub use envelope::Envelope;
pub use vault::SecretVault;
