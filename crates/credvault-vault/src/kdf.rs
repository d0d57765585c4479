// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 key derivation from a passphrase.
//!
//! Each encryption derives its own key from a fresh random salt, so two
//! envelopes never share a key even under the same passphrase.

use credvault_core::VaultError;
use pbkdf2::pbkdf2_hmac;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::envelope::NONCE_LENGTH;

/// Derive a `key_length`-byte key from a passphrase via PBKDF2-HMAC-SHA256.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
    key_length: usize,
) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; key_length]);
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, key.as_mut());
    key
}

/// Generate a random salt of the given length.
pub fn generate_salt(length: usize) -> Result<Vec<u8>, VaultError> {
    let rng = SystemRandom::new();
    let mut salt = vec![0u8; length];
    rng.fill(&mut salt).map_err(|_| VaultError::Crypto)?;
    Ok(salt)
}

/// Generate a random 96-bit AES-GCM nonce.
pub fn generate_nonce() -> Result<[u8; NONCE_LENGTH], VaultError> {
    let rng = SystemRandom::new();
    let mut nonce = [0u8; NONCE_LENGTH];
    rng.fill(&mut nonce).map_err(|_| VaultError::Crypto)?;
    Ok(nonce)
}
