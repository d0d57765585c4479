// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The AES-GCM cipher engine behind every envelope.
//!
//! Two key modes, fixed at construction:
//! - Passphrase: each [`CryptoEngine::encrypt`] derives a one-off key from a
//!   fresh salt via PBKDF2; the salt and iteration count travel in the
//!   envelope.
//! - Raw key: a pre-existing AES key is used directly; envelopes carry no
//!   KDF parameters.
//!
//! Decryption never crosses modes: a raw engine rejects pbkdf2 envelopes
//! and vice versa, reported as the same opaque [`VaultError::Crypto`] as a
//! wrong key or tampered ciphertext. Failure reasons are deliberately not
//! distinguished.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use credvault_config::model::CryptoConfig;
use credvault_core::{Kdf, VaultError};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::envelope::{Envelope, MIN_ITERATIONS, MIN_SALT_LENGTH};
use crate::kdf;

// aes-gcm ships named aliases for 128 and 256 only.
type Aes192Gcm = AesGcm<Aes192, U12>;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 210_000;

/// Default salt length in bytes.
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// Default AES key length in bits.
pub const DEFAULT_KEY_LENGTH_BITS: u32 = 256;

enum KeySource {
    Passphrase(SecretString),
    RawKey(Zeroizing<Vec<u8>>),
}

/// Validated engine parameters. Build via [`EngineConfig::builder`] or
/// bridge from the configuration file with [`EngineConfig::from_crypto_config`].
pub struct EngineConfig {
    source: KeySource,
    iterations: u32,
    salt_length: usize,
    key_length_bits: u32,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Build engine parameters from the `[crypto]` config section.
    pub fn from_crypto_config(config: &CryptoConfig) -> Result<Self, VaultError> {
        let mut builder = Self::builder()
            .iterations(config.pbkdf2_iterations)
            .salt_length(config.salt_length)
            .key_length_bits(config.key_length_bits);
        if let Some(passphrase) = &config.passphrase {
            builder = builder.passphrase(SecretString::from(passphrase.clone()));
        }
        if let Some(raw_hex) = &config.raw_key_hex {
            let key = hex::decode(raw_hex)
                .map_err(|e| VaultError::Config(format!("raw key is not valid hex: {e}")))?;
            builder = builder.raw_key(key);
        }
        builder.build()
    }
}

/// Builder for [`EngineConfig`]. All violations surface as
/// [`VaultError::Config`] from [`build`](EngineConfigBuilder::build).
#[derive(Default)]
pub struct EngineConfigBuilder {
    passphrase: Option<SecretString>,
    raw_key: Option<Zeroizing<Vec<u8>>>,
    iterations: Option<u32>,
    salt_length: Option<usize>,
    key_length_bits: Option<u32>,
}

impl EngineConfigBuilder {
    /// Use passphrase-derived keys (PBKDF2 mode).
    pub fn passphrase(mut self, passphrase: SecretString) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    /// Use a pre-existing AES key (raw mode). The key buffer is zeroed on
    /// drop.
    pub fn raw_key(mut self, key: Vec<u8>) -> Self {
        self.raw_key = Some(Zeroizing::new(key));
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn salt_length(mut self, salt_length: usize) -> Self {
        self.salt_length = Some(salt_length);
        self
    }

    pub fn key_length_bits(mut self, bits: u32) -> Self {
        self.key_length_bits = Some(bits);
        self
    }

    pub fn build(self) -> Result<EngineConfig, VaultError> {
        let iterations = self.iterations.unwrap_or(DEFAULT_ITERATIONS);
        let salt_length = self.salt_length.unwrap_or(DEFAULT_SALT_LENGTH);
        let key_length_bits = self.key_length_bits.unwrap_or(DEFAULT_KEY_LENGTH_BITS);

        if iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "pbkdf2 iterations must be at least {MIN_ITERATIONS}, got {iterations}"
            )));
        }
        if salt_length < MIN_SALT_LENGTH {
            return Err(VaultError::Config(format!(
                "salt length must be at least {MIN_SALT_LENGTH} bytes, got {salt_length}"
            )));
        }
        if !matches!(key_length_bits, 128 | 192 | 256) {
            return Err(VaultError::Config(format!(
                "key length must be 128, 192, or 256 bits, got {key_length_bits}"
            )));
        }

        let source = match (self.passphrase, self.raw_key) {
            (Some(_), Some(_)) => {
                return Err(VaultError::Config(
                    "provide exactly one of passphrase or raw key, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(VaultError::Config(
                    "provide exactly one of passphrase or raw key".to_string(),
                ));
            }
            (Some(passphrase), None) => KeySource::Passphrase(passphrase),
            (None, Some(key)) => {
                let expected = (key_length_bits / 8) as usize;
                if key.len() != expected {
                    return Err(VaultError::Config(format!(
                        "raw key is {} bytes, expected {expected} for a \
                         {key_length_bits}-bit key",
                        key.len()
                    )));
                }
                KeySource::RawKey(key)
            }
        };

        Ok(EngineConfig {
            source,
            iterations,
            salt_length,
            key_length_bits,
        })
    }
}

enum KeyMaterial {
    Passphrase(Zeroizing<Vec<u8>>),
    Raw(Zeroizing<Vec<u8>>),
    Closed,
}

/// The cipher engine. All operations take `&self`; there is no mutable
/// state between calls, so a shared reference is safe across tasks.
pub struct CryptoEngine {
    key_material: KeyMaterial,
    iterations: u32,
    salt_length: usize,
    key_length: usize,
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine")
            .field("key_material", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .field("key_length", &self.key_length)
            .finish()
    }
}

impl CryptoEngine {
    pub fn new(config: EngineConfig) -> Self {
        let key_material = match config.source {
            KeySource::Passphrase(passphrase) => KeyMaterial::Passphrase(Zeroizing::new(
                passphrase.expose_secret().as_bytes().to_vec(),
            )),
            KeySource::RawKey(key) => KeyMaterial::Raw(key),
        };
        Self {
            key_material,
            iterations: config.iterations,
            salt_length: config.salt_length,
            key_length: (config.key_length_bits / 8) as usize,
        }
    }

    /// Encrypt a plaintext buffer into a fresh envelope.
    ///
    /// A new nonce is generated per call; in passphrase mode a new salt and
    /// derived key as well. The input buffer is zeroed on every exit path.
    pub fn encrypt(
        &self,
        plaintext: Zeroizing<Vec<u8>>,
        aad: Option<&[u8]>,
    ) -> Result<Envelope, VaultError> {
        let aad = aad.unwrap_or_default();
        match &self.key_material {
            KeyMaterial::Passphrase(passphrase) => {
                let salt = kdf::generate_salt(self.salt_length)?;
                let key = kdf::derive_key(passphrase, &salt, self.iterations, self.key_length);
                let nonce = kdf::generate_nonce()?;
                let ciphertext = seal(&key, &nonce, &plaintext, aad)?;
                Envelope::pbkdf2(self.iterations, salt, nonce.to_vec(), ciphertext)
            }
            KeyMaterial::Raw(key) => {
                let nonce = kdf::generate_nonce()?;
                let ciphertext = seal(key, &nonce, &plaintext, aad)?;
                Envelope::raw(nonce.to_vec(), ciphertext)
            }
            KeyMaterial::Closed => Err(VaultError::Config(
                "crypto engine is closed".to_string(),
            )),
        }
    }

    /// Decrypt an envelope. The envelope's mode must match the engine's.
    ///
    /// Any failure -- wrong key, tampered nonce or ciphertext, AAD mismatch,
    /// mode mismatch -- is the same opaque [`VaultError::Crypto`]. Either
    /// the whole plaintext comes back or nothing does.
    pub fn decrypt(
        &self,
        envelope: &Envelope,
        aad: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let aad = aad.unwrap_or_default();
        match (&self.key_material, envelope.kdf()) {
            (KeyMaterial::Passphrase(passphrase), Kdf::Pbkdf2) => {
                // Envelope constructors guarantee these for pbkdf2 mode.
                let salt = envelope.salt().ok_or(VaultError::Crypto)?;
                let iterations = envelope.iterations().ok_or(VaultError::Crypto)?;
                let key = kdf::derive_key(passphrase, salt, iterations, self.key_length);
                open(&key, envelope.nonce(), envelope.ciphertext(), aad)
            }
            (KeyMaterial::Raw(key), Kdf::Raw) => {
                open(key, envelope.nonce(), envelope.ciphertext(), aad)
            }
            (KeyMaterial::Closed, _) => Err(VaultError::Config(
                "crypto engine is closed".to_string(),
            )),
            _ => Err(VaultError::Crypto),
        }
    }

    /// Encrypt a UTF-8 string.
    pub fn encrypt_str(&self, plaintext: &str, aad: Option<&[u8]>) -> Result<Envelope, VaultError> {
        self.encrypt(Zeroizing::new(plaintext.as_bytes().to_vec()), aad)
    }

    /// Decrypt an envelope whose plaintext is a UTF-8 string.
    pub fn decrypt_to_string(
        &self,
        envelope: &Envelope,
        aad: Option<&[u8]>,
    ) -> Result<SecretString, VaultError> {
        let plaintext = self.decrypt(envelope, aad)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| VaultError::Crypto)?;
        Ok(SecretString::from(text.to_string()))
    }

    /// Wipe the key material. Idempotent; the engine rejects all further
    /// operations.
    pub fn close(&mut self) {
        // Dropping the previous value zeroes the buffer.
        self.key_material = KeyMaterial::Closed;
    }
}

fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, VaultError> {
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    let nonce = Nonce::from_slice(nonce);
    let result = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| VaultError::Crypto)?
            .encrypt(nonce, payload),
        24 => Aes192Gcm::new_from_slice(key)
            .map_err(|_| VaultError::Crypto)?
            .encrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| VaultError::Crypto)?
            .encrypt(nonce, payload),
        _ => return Err(VaultError::Crypto),
    };
    result.map_err(|_| VaultError::Crypto)
}

fn open(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    let nonce = Nonce::from_slice(nonce);
    let result = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|_| VaultError::Crypto)?
            .decrypt(nonce, payload),
        24 => Aes192Gcm::new_from_slice(key)
            .map_err(|_| VaultError::Crypto)?
            .decrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| VaultError::Crypto)?
            .decrypt(nonce, payload),
        _ => return Err(VaultError::Crypto),
    };
    result.map(Zeroizing::new).map_err(|_| VaultError::Crypto)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_engine(bits: u32) -> CryptoEngine {
        let key = vec![0x42u8; (bits / 8) as usize];
        CryptoEngine::new(
            EngineConfig::builder()
                .raw_key(key)
                .key_length_bits(bits)
                .build()
                .unwrap(),
        )
    }

    fn passphrase_engine() -> CryptoEngine {
        // The floor, to keep test-time key derivation as cheap as allowed.
        CryptoEngine::new(
            EngineConfig::builder()
                .passphrase(SecretString::from("correct horse battery staple"))
                .iterations(100_000)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn builder_rejects_invalid_parameters() {
        assert!(matches!(
            EngineConfig::builder().build(),
            Err(VaultError::Config(_))
        ));
        assert!(EngineConfig::builder()
            .passphrase(SecretString::from("p"))
            .raw_key(vec![0; 32])
            .build()
            .is_err());
        assert!(EngineConfig::builder()
            .passphrase(SecretString::from("p"))
            .iterations(99_999)
            .build()
            .is_err());
        assert!(EngineConfig::builder()
            .passphrase(SecretString::from("p"))
            .salt_length(15)
            .build()
            .is_err());
        assert!(EngineConfig::builder()
            .passphrase(SecretString::from("p"))
            .key_length_bits(512)
            .build()
            .is_err());
        // Raw key length must match the configured bits.
        assert!(EngineConfig::builder()
            .raw_key(vec![0; 16])
            .key_length_bits(256)
            .build()
            .is_err());
    }

    #[test]
    fn raw_roundtrip_all_key_lengths() {
        for bits in [128, 192, 256] {
            let engine = raw_engine(bits);
            let envelope = engine.encrypt_str("the secret", Some(b"aad")).unwrap();
            assert_eq!(envelope.kdf(), Kdf::Raw);
            assert!(envelope.salt().is_none());
            let plaintext = engine.decrypt_to_string(&envelope, Some(b"aad")).unwrap();
            assert_eq!(plaintext.expose_secret(), "the secret");
        }
    }

    #[test]
    fn passphrase_roundtrip_carries_kdf_parameters() {
        let engine = passphrase_engine();
        let envelope = engine.encrypt_str("db password", None).unwrap();
        assert_eq!(envelope.kdf(), Kdf::Pbkdf2);
        assert_eq!(envelope.iterations(), Some(100_000));
        assert_eq!(envelope.salt().unwrap().len(), 16);
        assert_eq!(envelope.nonce().len(), 12);

        let plaintext = engine.decrypt_to_string(&envelope, None).unwrap();
        assert_eq!(plaintext.expose_secret(), "db password");
    }

    #[test]
    fn passphrase_mode_uses_fresh_salt_and_nonce_per_call() {
        let engine = passphrase_engine();
        let e1 = engine.encrypt_str("same input", None).unwrap();
        let e2 = engine.encrypt_str("same input", None).unwrap();
        assert_ne!(e1.salt(), e2.salt());
        assert_ne!(e1.nonce(), e2.nonce());
        assert_ne!(e1.ciphertext(), e2.ciphertext());
    }

    #[test]
    fn raw_mode_uses_fresh_nonce_per_call() {
        let engine = raw_engine(256);
        let e1 = engine.encrypt_str("same input", None).unwrap();
        let e2 = engine.encrypt_str("same input", None).unwrap();
        assert_ne!(e1.nonce(), e2.nonce());
        assert_ne!(e1.ciphertext(), e2.ciphertext());
    }

    #[test]
    fn aad_mismatch_fails_opaquely() {
        let engine = raw_engine(256);
        let envelope = engine.encrypt_str("bound to aad", Some(b"deploy-a")).unwrap();

        let err = engine
            .decrypt(&envelope, Some(b"deploy-b"))
            .unwrap_err();
        assert!(matches!(err, VaultError::Crypto));
        assert_eq!(err.to_string(), "crypto operation failed");

        // Missing AAD fails the same way.
        assert!(engine.decrypt(&envelope, None).is_err());
    }

    #[test]
    fn tampered_ciphertext_or_nonce_fails() {
        let engine = raw_engine(256);
        let envelope = engine.encrypt_str("do not tamper", None).unwrap();

        let mut ciphertext = envelope.ciphertext().to_vec();
        ciphertext[0] ^= 0x01;
        let tampered = Envelope::raw(envelope.nonce().to_vec(), ciphertext).unwrap();
        assert!(matches!(
            engine.decrypt(&tampered, None),
            Err(VaultError::Crypto)
        ));

        let mut nonce = envelope.nonce().to_vec();
        nonce[0] ^= 0x01;
        let tampered = Envelope::raw(nonce, envelope.ciphertext().to_vec()).unwrap();
        assert!(matches!(
            engine.decrypt(&tampered, None),
            Err(VaultError::Crypto)
        ));
    }

    #[test]
    fn wrong_raw_key_fails() {
        let engine = raw_engine(256);
        let envelope = engine.encrypt_str("secret", None).unwrap();

        let other = CryptoEngine::new(
            EngineConfig::builder().raw_key(vec![0x24; 32]).build().unwrap(),
        );
        assert!(matches!(
            other.decrypt(&envelope, None),
            Err(VaultError::Crypto)
        ));
    }

    #[test]
    fn mode_mismatch_is_crypto_error() {
        let raw = raw_engine(256);
        let envelope = raw.encrypt_str("raw secret", None).unwrap();

        let passphrase = passphrase_engine();
        assert!(matches!(
            passphrase.decrypt(&envelope, None),
            Err(VaultError::Crypto)
        ));

        let envelope = passphrase.encrypt_str("derived secret", None).unwrap();
        assert!(matches!(
            raw.decrypt(&envelope, None),
            Err(VaultError::Crypto)
        ));
    }

    #[test]
    fn envelope_text_survives_storage_and_decrypts() {
        let engine = raw_engine(128);
        let envelope = engine.encrypt_str("roundtrip via text", Some(b"x")).unwrap();
        let reparsed = Envelope::decode(&envelope.encode()).unwrap();
        let plaintext = engine.decrypt_to_string(&reparsed, Some(b"x")).unwrap();
        assert_eq!(plaintext.expose_secret(), "roundtrip via text");
    }

    #[test]
    fn ciphertext_includes_gcm_tag() {
        let engine = raw_engine(256);
        let envelope = engine.encrypt_str("hello", None).unwrap();
        assert_eq!(envelope.ciphertext().len(), "hello".len() + 16);
    }

    #[test]
    fn closed_engine_rejects_operations() {
        let mut engine = raw_engine(256);
        let envelope = engine.encrypt_str("before close", None).unwrap();

        engine.close();
        engine.close(); // idempotent

        assert!(matches!(
            engine.encrypt_str("after close", None),
            Err(VaultError::Config(_))
        ));
        assert!(matches!(
            engine.decrypt(&envelope, None),
            Err(VaultError::Config(_))
        ));
    }

    #[test]
    fn non_utf8_plaintext_fails_string_decrypt() {
        let engine = raw_engine(256);
        let envelope = engine
            .encrypt(Zeroizing::new(vec![0xff, 0xfe, 0xfd]), None)
            .unwrap();
        assert!(matches!(
            engine.decrypt_to_string(&envelope, None),
            Err(VaultError::Crypto)
        ));
        // The raw bytes still decrypt fine.
        assert_eq!(*engine.decrypt(&envelope, None).unwrap(), vec![0xff, 0xfe, 0xfd]);
    }
}
