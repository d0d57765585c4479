// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the credvault secrets store.
//!
//! Provides the error taxonomy and the shared domain enums used throughout
//! the credvault workspace.

pub mod error;
pub mod types;

pub use error::VaultError;
pub use types::{CredentialType, Environment, Kdf};
