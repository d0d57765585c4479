// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the credvault workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Key derivation mode of a cipher envelope.
///
/// `Pbkdf2` envelopes carry their own salt and iteration count; `Raw`
/// envelopes are keyed directly by a pre-existing symmetric key. The
/// Display form is the envelope wire tag (`pbkdf2` / `raw`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Kdf {
    Pbkdf2,
    Raw,
}

/// Deployment environment a credential belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Dev,
    Qa,
    Uat,
    Prod,
}

/// Classification of a stored credential.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialType {
    Database,
    Windows,
    Linux,
    ApiKey,
    JwtToken,
    Other,
}
