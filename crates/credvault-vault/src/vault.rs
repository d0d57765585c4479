// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The secret vault: a cipher engine bound to the deployment's AAD.
//!
//! Every encryption binds the configured associated data, so envelopes
//! cannot be replayed between deployments with different AAD strings even
//! under the same key.

use credvault_config::model::CryptoConfig;
use credvault_core::VaultError;
use credvault_storage::EnvelopeRow;
use secrecy::{ExposeSecret, SecretString};

use crate::engine::{CryptoEngine, EngineConfig};
use crate::envelope::Envelope;

pub struct SecretVault {
    engine: CryptoEngine,
    aad: Vec<u8>,
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("engine", &self.engine)
            .finish()
    }
}

impl SecretVault {
    pub fn new(engine: CryptoEngine, aad: impl Into<Vec<u8>>) -> Self {
        Self {
            engine,
            aad: aad.into(),
        }
    }

    /// Build a vault from the `[crypto]` config section.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, VaultError> {
        let engine = CryptoEngine::new(EngineConfig::from_crypto_config(config)?);
        Ok(Self::new(engine, config.aad.as_bytes().to_vec()))
    }

    /// Encrypt a secret string into an envelope bound to this vault's AAD.
    pub fn encrypt_secret(&self, secret: &SecretString) -> Result<Envelope, VaultError> {
        self.engine.encrypt_str(secret.expose_secret(), Some(&self.aad))
    }

    /// Decrypt an envelope produced by [`encrypt_secret`](Self::encrypt_secret).
    pub fn decrypt_secret(&self, envelope: &Envelope) -> Result<SecretString, VaultError> {
        self.engine.decrypt_to_string(envelope, Some(&self.aad))
    }

    /// Encrypt straight to the storage row shape.
    pub fn encrypt_to_row(&self, secret: &SecretString) -> Result<EnvelopeRow, VaultError> {
        Ok(self.encrypt_secret(secret)?.to_row())
    }

    /// Decrypt straight from the storage row shape.
    pub fn decrypt_from_row(&self, row: EnvelopeRow) -> Result<SecretString, VaultError> {
        self.decrypt_secret(&Envelope::from_row(row)?)
    }

    /// Compare a candidate against the envelope's plaintext in constant
    /// time. Decryption failures propagate; a mere mismatch is `Ok(false)`.
    pub fn verify_secret(&self, envelope: &Envelope, candidate: &str) -> Result<bool, VaultError> {
        let plaintext = self.engine.decrypt(envelope, Some(&self.aad))?;
        Ok(ring::constant_time::verify_slices_are_equal(&plaintext, candidate.as_bytes()).is_ok())
    }

    /// Wipe the engine's key material. Idempotent.
    pub fn close(&mut self) {
        self.engine.close();
    }
}
