// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned credential chain lifecycle.
//!
//! A credential is never edited in place. Updating appends a new version
//! node with a fresh envelope and links the old latest to it; the storage
//! layer's compare-and-swap guarantees a single winner under concurrency.
//! Deletion is a per-node soft toggle; history survives.

use std::str::FromStr;

use credvault_core::{CredentialType, Environment, VaultError};
use credvault_storage::queries::{credentials as queries, envelopes};
use credvault_storage::{
    Credential, CredentialUpdate, Database, NewCredential, SupersedeOutcome,
};
use secrecy::SecretString;
use tracing::debug;

use crate::vault::SecretVault;

/// Input for creating or superseding a credential.
///
/// On update, `username` is ignored: the chain keeps the username of the
/// node being superseded.
#[derive(Debug)]
pub struct CredentialRequest {
    pub app: String,
    pub environment: Environment,
    pub credential_type: CredentialType,
    pub username: String,
    pub secret: SecretString,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

/// A fully resolved credential version, password decrypted.
#[derive(Debug)]
pub struct CredentialView {
    pub id: i64,
    pub app: String,
    pub environment: Environment,
    pub credential_type: CredentialType,
    pub username: String,
    pub password: SecretString,
    pub version: i64,
    pub enabled: bool,
    pub is_latest: bool,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

pub struct CredentialService {
    db: Database,
    vault: SecretVault,
}

impl CredentialService {
    pub fn new(db: Database, vault: SecretVault) -> Self {
        Self { db, vault }
    }

    /// Create the first version of a new chain. Returns the new node's ID.
    pub async fn create(&self, request: CredentialRequest) -> Result<i64, VaultError> {
        let envelope = self.vault.encrypt_to_row(&request.secret)?;
        let id = queries::create_credential(
            &self.db,
            NewCredential {
                app: request.app,
                environment: request.environment.to_string(),
                credential_type: request.credential_type.to_string(),
                username: request.username,
                url: request.url,
                notes: request.notes,
                created_by: request.created_by,
                envelope,
            },
        )
        .await?;
        debug!(id, "credential created");
        Ok(id)
    }

    /// Supersede the node `id` with a new version. Returns the new node's ID.
    ///
    /// Fails with [`VaultError::NotLatest`] when `id` already has a
    /// successor (or loses a concurrent update race), and with
    /// [`VaultError::NotFound`] when `id` does not exist.
    pub async fn update(&self, id: i64, request: CredentialRequest) -> Result<i64, VaultError> {
        let envelope = self.vault.encrypt_to_row(&request.secret)?;
        let outcome = queries::supersede_credential(
            &self.db,
            id,
            CredentialUpdate {
                app: request.app,
                environment: request.environment.to_string(),
                credential_type: request.credential_type.to_string(),
                url: request.url,
                notes: request.notes,
                created_by: request.created_by,
                envelope,
            },
        )
        .await?;
        match outcome {
            SupersedeOutcome::Superseded(new_id) => {
                debug!(old = id, new = new_id, "credential superseded");
                Ok(new_id)
            }
            SupersedeOutcome::NotLatest => Err(VaultError::NotLatest),
            SupersedeOutcome::NotFound => Err(VaultError::NotFound(format!("credential {id}"))),
        }
    }

    /// Soft-delete one version node. Chain links are untouched.
    pub async fn disable(&self, id: i64) -> Result<(), VaultError> {
        if !queries::set_enabled(&self.db, id, false).await? {
            return Err(VaultError::NotFound(format!("credential {id}")));
        }
        debug!(id, "credential disabled");
        Ok(())
    }

    /// Re-enable a previously disabled node.
    pub async fn enable(&self, id: i64) -> Result<(), VaultError> {
        if !queries::set_enabled(&self.db, id, true).await? {
            return Err(VaultError::NotFound(format!("credential {id}")));
        }
        debug!(id, "credential enabled");
        Ok(())
    }

    /// Resolve one node with its decrypted password.
    pub async fn get(&self, id: i64) -> Result<CredentialView, VaultError> {
        let node = queries::get_credential(&self.db, id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("credential {id}")))?;
        self.to_view(node).await
    }

    /// The node and its ancestors, newest first. Successor versions of `id`
    /// are not included.
    pub async fn history(&self, id: i64) -> Result<Vec<CredentialView>, VaultError> {
        let nodes = queries::credential_history(&self.db, id).await?;
        if nodes.is_empty() {
            return Err(VaultError::NotFound(format!("credential {id}")));
        }
        let mut views = Vec::with_capacity(nodes.len());
        for node in nodes {
            views.push(self.to_view(node).await?);
        }
        Ok(views)
    }

    /// The credential-lookup consumer: resolve the latest enabled version
    /// of a chain and decrypt its password. `None` when no chain matches
    /// or its latest version is disabled.
    pub async fn lookup_password(
        &self,
        app: &str,
        environment: Environment,
        credential_type: CredentialType,
        username: &str,
    ) -> Result<Option<SecretString>, VaultError> {
        let node = queries::find_latest(
            &self.db,
            app,
            &environment.to_string(),
            &credential_type.to_string(),
            username,
        )
        .await?;
        let Some(node) = node else {
            return Ok(None);
        };
        let row = self.envelope_row(node.envelope_id).await?;
        Ok(Some(self.vault.decrypt_from_row(row)?))
    }

    async fn envelope_row(
        &self,
        envelope_id: i64,
    ) -> Result<credvault_storage::EnvelopeRow, VaultError> {
        envelopes::get_envelope(&self.db, envelope_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("envelope {envelope_id}")))
    }

    async fn to_view(&self, node: Credential) -> Result<CredentialView, VaultError> {
        let row = self.envelope_row(node.envelope_id).await?;
        let password = self.vault.decrypt_from_row(row)?;
        let environment = Environment::from_str(&node.environment).map_err(|_| {
            VaultError::Format(format!(
                "stored credential {} has unknown environment `{}`",
                node.id, node.environment
            ))
        })?;
        let credential_type = CredentialType::from_str(&node.credential_type).map_err(|_| {
            VaultError::Format(format!(
                "stored credential {} has unknown type `{}`",
                node.id, node.credential_type
            ))
        })?;
        Ok(CredentialView {
            id: node.id,
            app: node.app,
            environment,
            credential_type,
            username: node.username,
            password,
            version: node.version,
            enabled: node.enabled,
            is_latest: node.next_id.is_none(),
            url: node.url,
            notes: node.notes,
            created_by: node.created_by,
            created_at: node.created_at,
        })
    }
}
