// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key lifecycle and authentication.
//!
//! API keys are mutable in place (in contrast to credential chains) and
//! deletes are hard. Authentication decrypts the stored secret and compares
//! in constant time, then applies the optional host restriction.

use std::str::FromStr;

use credvault_core::{Environment, VaultError};
use credvault_storage::queries::{api_keys as queries, envelopes};
use credvault_storage::{ApiKey, ApiKeyUpdate, Database, NewApiKey};
use secrecy::SecretString;
use tracing::debug;

use crate::envelope::Envelope;
use crate::vault::SecretVault;

/// Input for creating an API key.
#[derive(Debug)]
pub struct NewApiKeyRequest {
    pub app: String,
    pub environment: Environment,
    pub client_id: String,
    pub secret: SecretString,
    pub server: Option<String>,
    pub updated_by: String,
}

/// Input for updating an API key. `client_id` is immutable; a `None`
/// secret keeps the stored envelope unchanged.
#[derive(Debug)]
pub struct ApiKeyUpdateRequest {
    pub app: String,
    pub environment: Environment,
    pub secret: Option<SecretString>,
    pub server: Option<String>,
    pub updated_by: String,
}

/// A fully resolved API key, secret decrypted.
#[derive(Debug)]
pub struct ApiKeyView {
    pub id: i64,
    pub app: String,
    pub environment: Environment,
    pub client_id: String,
    pub secret: SecretString,
    pub server: Option<String>,
    pub updated_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of an authentication attempt.
///
/// An unknown client ID and a wrong secret are deliberately the same
/// outcome, so callers cannot probe which client IDs exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    InvalidKey,
    HostNotAllowed,
}

pub struct ApiKeyService {
    db: Database,
    vault: SecretVault,
}

impl ApiKeyService {
    pub fn new(db: Database, vault: SecretVault) -> Self {
        Self { db, vault }
    }

    /// Create a new API key. Returns its ID.
    pub async fn create(&self, request: NewApiKeyRequest) -> Result<i64, VaultError> {
        let envelope = self.vault.encrypt_to_row(&request.secret)?;
        let id = queries::create_api_key(
            &self.db,
            NewApiKey {
                app: request.app,
                environment: request.environment.to_string(),
                client_id: request.client_id,
                server: request.server,
                updated_by: request.updated_by,
                envelope,
            },
        )
        .await?;
        debug!(id, "api key created");
        Ok(id)
    }

    /// Update an API key. Re-encrypts only when a new secret is supplied.
    pub async fn update(&self, id: i64, request: ApiKeyUpdateRequest) -> Result<(), VaultError> {
        let envelope = match &request.secret {
            Some(secret) => Some(self.vault.encrypt_to_row(secret)?),
            None => None,
        };
        let found = queries::update_api_key(
            &self.db,
            id,
            ApiKeyUpdate {
                app: request.app,
                environment: request.environment.to_string(),
                server: request.server,
                updated_by: request.updated_by,
                envelope,
            },
        )
        .await?;
        if !found {
            return Err(VaultError::NotFound(format!("api key {id}")));
        }
        debug!(id, "api key updated");
        Ok(())
    }

    /// Hard-delete an API key and its envelope.
    pub async fn delete(&self, id: i64) -> Result<(), VaultError> {
        if !queries::delete_api_key(&self.db, id).await? {
            return Err(VaultError::NotFound(format!("api key {id}")));
        }
        debug!(id, "api key deleted");
        Ok(())
    }

    /// Resolve an API key with its decrypted secret.
    pub async fn get(&self, id: i64) -> Result<ApiKeyView, VaultError> {
        let key = queries::get_api_key(&self.db, id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("api key {id}")))?;
        self.to_view(key).await
    }

    /// List all keys, metadata only -- secrets stay encrypted.
    pub async fn list(&self) -> Result<Vec<ApiKey>, VaultError> {
        queries::list_api_keys(&self.db).await
    }

    /// Whether a key already exists for the (app, environment) pair.
    pub async fn exists(&self, app: &str, environment: Environment) -> Result<bool, VaultError> {
        queries::exists_by_app_environment(&self.db, app, &environment.to_string()).await
    }

    /// Authenticate a presented secret against the stored key.
    ///
    /// Decision ladder: unknown client ID -> `InvalidKey`; constant-time
    /// secret mismatch -> `InvalidKey`; `server` restriction set and the
    /// caller host does not match (case-insensitive) -> `HostNotAllowed`.
    pub async fn authenticate(
        &self,
        client_id: &str,
        presented_secret: &str,
        caller_host: Option<&str>,
    ) -> Result<AuthOutcome, VaultError> {
        let Some(key) = queries::find_by_client_id(&self.db, client_id).await? else {
            debug!("authentication failed: unknown client id");
            return Ok(AuthOutcome::InvalidKey);
        };

        let row = envelopes::get_envelope(&self.db, key.envelope_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("envelope {}", key.envelope_id)))?;
        let envelope = Envelope::from_row(row)?;
        if !self.vault.verify_secret(&envelope, presented_secret)? {
            debug!(id = key.id, "authentication failed: secret mismatch");
            return Ok(AuthOutcome::InvalidKey);
        }

        if let Some(server) = &key.server {
            let allowed = caller_host
                .map(|host| host.eq_ignore_ascii_case(server))
                .unwrap_or(false);
            if !allowed {
                debug!(id = key.id, "authentication failed: host not allowed");
                return Ok(AuthOutcome::HostNotAllowed);
            }
        }

        Ok(AuthOutcome::Authorized)
    }

    async fn to_view(&self, key: ApiKey) -> Result<ApiKeyView, VaultError> {
        let row = envelopes::get_envelope(&self.db, key.envelope_id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("envelope {}", key.envelope_id)))?;
        let secret = self.vault.decrypt_from_row(row)?;
        let environment = Environment::from_str(&key.environment).map_err(|_| {
            VaultError::Format(format!(
                "stored api key {} has unknown environment `{}`",
                key.id, key.environment
            ))
        })?;
        Ok(ApiKeyView {
            id: key.id,
            app: key.app,
            environment,
            client_id: key.client_id,
            secret,
            server: key.server,
            updated_by: key.updated_by,
            created_at: key.created_at,
            updated_at: key.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CryptoEngine, EngineConfig};
    use secrecy::ExposeSecret;
    use tempfile::tempdir;

    fn test_vault() -> SecretVault {
        let config = EngineConfig::builder()
            .raw_key(vec![0x42u8; 32])
            .build()
            .unwrap();
        SecretVault::new(CryptoEngine::new(config), "test-deploy".as_bytes().to_vec())
    }

    async fn setup() -> (ApiKeyService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (ApiKeyService::new(db, test_vault()), dir)
    }

    fn make_request(client_id: &str, server: Option<&str>) -> NewApiKeyRequest {
        NewApiKeyRequest {
            app: "reporting".to_string(),
            environment: Environment::Uat,
            client_id: client_id.to_string(),
            secret: SecretString::from("key-secret-123"),
            server: server.map(str::to_string),
            updated_by: "carol".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_decrypts_secret() {
        let (service, _dir) = setup().await;

        let id = service.create(make_request("client-1", None)).await.unwrap();
        let view = service.get(id).await.unwrap();

        assert_eq!(view.client_id, "client-1");
        assert_eq!(view.secret.expose_secret(), "key-secret-123");
        assert_eq!(view.environment, Environment::Uat);

        assert!(service.exists("reporting", Environment::Uat).await.unwrap());
        assert!(!service.exists("reporting", Environment::Prod).await.unwrap());
    }

    #[tokio::test]
    async fn update_without_secret_keeps_old_secret() {
        let (service, _dir) = setup().await;

        let id = service.create(make_request("client-2", None)).await.unwrap();
        service
            .update(
                id,
                ApiKeyUpdateRequest {
                    app: "reporting".to_string(),
                    environment: Environment::Uat,
                    secret: None,
                    server: Some("app-host".to_string()),
                    updated_by: "dave".to_string(),
                },
            )
            .await
            .unwrap();

        let view = service.get(id).await.unwrap();
        assert_eq!(view.secret.expose_secret(), "key-secret-123");
        assert_eq!(view.server.as_deref(), Some("app-host"));
        assert_eq!(view.updated_by, "dave");
    }

    #[tokio::test]
    async fn update_with_secret_rotates_envelope() {
        let (service, _dir) = setup().await;

        let id = service.create(make_request("client-3", None)).await.unwrap();
        service
            .update(
                id,
                ApiKeyUpdateRequest {
                    app: "reporting".to_string(),
                    environment: Environment::Uat,
                    secret: Some(SecretString::from("rotated-secret")),
                    server: None,
                    updated_by: "carol".to_string(),
                },
            )
            .await
            .unwrap();

        let view = service.get(id).await.unwrap();
        assert_eq!(view.secret.expose_secret(), "rotated-secret");
    }

    #[tokio::test]
    async fn delete_is_hard_and_not_found_after() {
        let (service, _dir) = setup().await;

        let id = service.create(make_request("client-4", None)).await.unwrap();
        service.delete(id).await.unwrap();

        assert!(matches!(
            service.get(id).await.unwrap_err(),
            VaultError::NotFound(_)
        ));
        assert!(matches!(
            service.delete(id).await.unwrap_err(),
            VaultError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn authenticate_accepts_correct_secret() {
        let (service, _dir) = setup().await;
        service.create(make_request("client-5", None)).await.unwrap();

        let outcome = service
            .authenticate("client-5", "key-secret-123", None)
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Authorized);
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_secret_and_unknown_client() {
        let (service, _dir) = setup().await;
        service.create(make_request("client-6", None)).await.unwrap();

        let outcome = service
            .authenticate("client-6", "wrong-secret", None)
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidKey);

        // Unknown client is indistinguishable from a wrong secret.
        let outcome = service
            .authenticate("no-such-client", "key-secret-123", None)
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidKey);
    }

    #[tokio::test]
    async fn authenticate_enforces_host_restriction() {
        let (service, _dir) = setup().await;
        service
            .create(make_request("client-7", Some("App-Host.internal")))
            .await
            .unwrap();

        // Matching host, case-insensitively.
        let outcome = service
            .authenticate("client-7", "key-secret-123", Some("app-host.INTERNAL"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Authorized);

        // Wrong host.
        let outcome = service
            .authenticate("client-7", "key-secret-123", Some("elsewhere"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::HostNotAllowed);

        // No host presented at all.
        let outcome = service
            .authenticate("client-7", "key-secret-123", None)
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::HostNotAllowed);

        // Secret check comes before the host check.
        let outcome = service
            .authenticate("client-7", "wrong", Some("app-host.internal"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::InvalidKey);
    }

    #[tokio::test]
    async fn list_returns_metadata_only() {
        let (service, _dir) = setup().await;
        service.create(make_request("client-8", None)).await.unwrap();

        let keys = service.list().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].client_id, "client-8");
        // The raw record exposes the envelope pointer, never a plaintext.
        assert!(keys[0].envelope_id > 0);
    }
}
