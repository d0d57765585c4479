// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The self-describing cipher envelope and its textual codec.
//!
//! Textual forms, colon-delimited with base64 (STANDARD) binary fields:
//!
//! ```text
//! v1:pbkdf2:<iterations>:<b64 salt>:<b64 nonce>:<b64 ciphertext>
//! v1:raw:<b64 nonce>:<b64 ciphertext>
//! ```
//!
//! An envelope can only be constructed through the validating constructors,
//! so any `Envelope` value in the program satisfies the mode invariants.
//! The textual form carries no plaintext and is safe to log.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use credvault_core::{Kdf, VaultError};
use credvault_storage::EnvelopeRow;

/// Envelope format version tag.
pub const ENVELOPE_VERSION: &str = "v1";

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LENGTH: usize = 12;

/// Minimum PBKDF2 iteration count an envelope may carry.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Minimum salt length in bytes.
pub const MIN_SALT_LENGTH: usize = 16;

/// An immutable cipher envelope: ciphertext plus everything needed to
/// decrypt it again, except the secret key material itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    kdf: Kdf,
    iterations: Option<u32>,
    salt: Option<Vec<u8>>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Construct a PBKDF2-mode envelope.
    ///
    /// Rejects iteration counts below [`MIN_ITERATIONS`] and salts shorter
    /// than [`MIN_SALT_LENGTH`] bytes.
    pub fn pbkdf2(
        iterations: u32,
        salt: Vec<u8>,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
    ) -> Result<Self, VaultError> {
        if iterations < MIN_ITERATIONS {
            return Err(VaultError::Format(format!(
                "iteration count {iterations} below minimum {MIN_ITERATIONS}"
            )));
        }
        if salt.len() < MIN_SALT_LENGTH {
            return Err(VaultError::Format(format!(
                "salt must be at least {MIN_SALT_LENGTH} bytes, got {}",
                salt.len()
            )));
        }
        check_payload(&nonce, &ciphertext)?;
        Ok(Self {
            kdf: Kdf::Pbkdf2,
            iterations: Some(iterations),
            salt: Some(salt),
            nonce,
            ciphertext,
        })
    }

    /// Construct a raw-key-mode envelope. Carries no KDF parameters.
    pub fn raw(nonce: Vec<u8>, ciphertext: Vec<u8>) -> Result<Self, VaultError> {
        check_payload(&nonce, &ciphertext)?;
        Ok(Self {
            kdf: Kdf::Raw,
            iterations: None,
            salt: None,
            nonce,
            ciphertext,
        })
    }

    pub fn kdf(&self) -> Kdf {
        self.kdf
    }

    pub fn iterations(&self) -> Option<u32> {
        self.iterations
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Render the colon-delimited textual form.
    pub fn encode(&self) -> String {
        match self.kdf {
            Kdf::Pbkdf2 => format!(
                "{ENVELOPE_VERSION}:{}:{}:{}:{}:{}",
                self.kdf,
                // Constructor guarantees both fields for pbkdf2 envelopes.
                self.iterations.unwrap_or_default(),
                BASE64.encode(self.salt.as_deref().unwrap_or_default()),
                BASE64.encode(&self.nonce),
                BASE64.encode(&self.ciphertext),
            ),
            Kdf::Raw => format!(
                "{ENVELOPE_VERSION}:{}:{}:{}",
                self.kdf,
                BASE64.encode(&self.nonce),
                BASE64.encode(&self.ciphertext),
            ),
        }
    }

    /// Parse the textual form. Strict: exact field counts per mode, known
    /// version tag, valid base64. All failures are [`VaultError::Format`].
    pub fn decode(text: &str) -> Result<Self, VaultError> {
        let fields: Vec<&str> = text.split(':').collect();
        if fields.len() < 2 {
            return Err(VaultError::Format(
                "envelope has too few fields".to_string(),
            ));
        }
        if fields[0] != ENVELOPE_VERSION {
            return Err(VaultError::Format(format!(
                "unsupported envelope version `{}`",
                fields[0]
            )));
        }
        let kdf = Kdf::from_str(fields[1])
            .map_err(|_| VaultError::Format(format!("unknown kdf mode `{}`", fields[1])))?;

        match kdf {
            Kdf::Pbkdf2 => {
                if fields.len() != 6 {
                    return Err(VaultError::Format(format!(
                        "pbkdf2 envelope must have 6 fields, got {}",
                        fields.len()
                    )));
                }
                let iterations: u32 = fields[2].parse().map_err(|_| {
                    VaultError::Format("invalid iteration count field".to_string())
                })?;
                Self::pbkdf2(
                    iterations,
                    decode_b64(fields[3], "salt")?,
                    decode_b64(fields[4], "nonce")?,
                    decode_b64(fields[5], "ciphertext")?,
                )
            }
            Kdf::Raw => {
                if fields.len() != 4 {
                    return Err(VaultError::Format(format!(
                        "raw envelope must have 4 fields, got {}",
                        fields.len()
                    )));
                }
                Self::raw(
                    decode_b64(fields[2], "nonce")?,
                    decode_b64(fields[3], "ciphertext")?,
                )
            }
        }
    }

    /// Convert to the storage row representation.
    pub fn to_row(&self) -> EnvelopeRow {
        EnvelopeRow {
            version: ENVELOPE_VERSION.to_string(),
            kdf: self.kdf.to_string(),
            iterations: self.iterations,
            salt: self.salt.clone(),
            nonce: self.nonce.clone(),
            ciphertext: self.ciphertext.clone(),
        }
    }

    /// Rebuild an envelope from a storage row, re-checking the invariants.
    pub fn from_row(row: EnvelopeRow) -> Result<Self, VaultError> {
        if row.version != ENVELOPE_VERSION {
            return Err(VaultError::Format(format!(
                "unsupported envelope version `{}`",
                row.version
            )));
        }
        let kdf = Kdf::from_str(&row.kdf)
            .map_err(|_| VaultError::Format(format!("unknown kdf mode `{}`", row.kdf)))?;
        match kdf {
            Kdf::Pbkdf2 => {
                let iterations = row.iterations.ok_or_else(|| {
                    VaultError::Format("pbkdf2 envelope row missing iterations".to_string())
                })?;
                let salt = row.salt.ok_or_else(|| {
                    VaultError::Format("pbkdf2 envelope row missing salt".to_string())
                })?;
                Self::pbkdf2(iterations, salt, row.nonce, row.ciphertext)
            }
            Kdf::Raw => {
                if row.iterations.is_some() || row.salt.is_some() {
                    return Err(VaultError::Format(
                        "raw envelope row carries kdf parameters".to_string(),
                    ));
                }
                Self::raw(row.nonce, row.ciphertext)
            }
        }
    }
}

fn check_payload(nonce: &[u8], ciphertext: &[u8]) -> Result<(), VaultError> {
    if nonce.len() != NONCE_LENGTH {
        return Err(VaultError::Format(format!(
            "nonce must be {NONCE_LENGTH} bytes, got {}",
            nonce.len()
        )));
    }
    if ciphertext.is_empty() {
        return Err(VaultError::Format(
            "ciphertext must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn decode_b64(field: &str, name: &str) -> Result<Vec<u8>, VaultError> {
    BASE64
        .decode(field)
        .map_err(|_| VaultError::Format(format!("invalid base64 in {name} field")))
}
