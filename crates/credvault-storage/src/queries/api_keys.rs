// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key CRUD operations.
//!
//! Unlike credentials, API keys are mutable in place and deletes are hard:
//! removing a key also removes its envelope.

use credvault_core::VaultError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{ApiKey, ApiKeyUpdate, NewApiKey};
use crate::queries::envelopes;

fn row_to_api_key(row: &rusqlite::Row<'_>) -> Result<ApiKey, rusqlite::Error> {
    Ok(ApiKey {
        id: row.get(0)?,
        envelope_id: row.get(1)?,
        app: row.get(2)?,
        environment: row.get(3)?,
        client_id: row.get(4)?,
        server: row.get(5)?,
        updated_by: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const API_KEY_COLUMNS: &str = "id, envelope_id, app, environment, client_id, server,
     updated_by, created_at, updated_at";

/// Create a new API key with its envelope in one transaction.
/// Returns the new key's ID.
pub async fn create_api_key(db: &Database, new: NewApiKey) -> Result<i64, VaultError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let tx = conn.transaction()?;
            let envelope_id = envelopes::insert_envelope(&tx, &new.envelope)?;
            tx.execute(
                "INSERT INTO api_key (envelope_id, app, environment, client_id, server, updated_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    envelope_id,
                    new.app,
                    new.environment,
                    new.client_id,
                    new.server,
                    new.updated_by,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an API key by ID.
pub async fn get_api_key(db: &Database, id: i64) -> Result<Option<ApiKey>, VaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {API_KEY_COLUMNS} FROM api_key WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_api_key);
            match result {
                Ok(key) => Ok(Some(key)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find an API key by its public client identifier.
pub async fn find_by_client_id(
    db: &Database,
    client_id: &str,
) -> Result<Option<ApiKey>, VaultError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {API_KEY_COLUMNS} FROM api_key WHERE client_id = ?1"
            ))?;
            let result = stmt.query_row(params![client_id], row_to_api_key);
            match result {
                Ok(key) => Ok(Some(key)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Check whether a key already exists for the given (app, environment) pair.
pub async fn exists_by_app_environment(
    db: &Database,
    app: &str,
    environment: &str,
) -> Result<bool, VaultError> {
    let app = app.to_string();
    let environment = environment.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM api_key WHERE app = ?1 AND environment = ?2",
                params![app, environment],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all API keys, ordered by app then environment.
pub async fn list_api_keys(db: &Database) -> Result<Vec<ApiKey>, VaultError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {API_KEY_COLUMNS} FROM api_key ORDER BY app, environment"
            ))?;
            let rows = stmt.query_map([], row_to_api_key)?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update an API key's fields and optionally replace its envelope.
///
/// When a new envelope is supplied the old one is deleted in the same
/// transaction. `client_id` never changes. Returns `false` if the ID does
/// not exist.
pub async fn update_api_key(
    db: &Database,
    id: i64,
    update: ApiKeyUpdate,
) -> Result<bool, VaultError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;

            let old_envelope_id = {
                let result = tx.query_row(
                    "SELECT envelope_id FROM api_key WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, i64>(0),
                );
                match result {
                    Ok(envelope_id) => envelope_id,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
                    Err(e) => return Err(e),
                }
            };

            tx.execute(
                "UPDATE api_key SET app = ?1, environment = ?2, server = ?3, updated_by = ?4,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?5",
                params![update.app, update.environment, update.server, update.updated_by, id],
            )?;

            if let Some(envelope) = &update.envelope {
                let new_envelope_id = envelopes::insert_envelope(&tx, envelope)?;
                tx.execute(
                    "UPDATE api_key SET envelope_id = ?1 WHERE id = ?2",
                    params![new_envelope_id, id],
                )?;
                envelopes::delete_envelope(&tx, old_envelope_id)?;
            }

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Hard-delete an API key and its envelope. Returns `false` if the ID does
/// not exist.
pub async fn delete_api_key(db: &Database, id: i64) -> Result<bool, VaultError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;

            let envelope_id = {
                let result = tx.query_row(
                    "SELECT envelope_id FROM api_key WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, i64>(0),
                );
                match result {
                    Ok(envelope_id) => envelope_id,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
                    Err(e) => return Err(e),
                }
            };

            tx.execute("DELETE FROM api_key WHERE id = ?1", params![id])?;
            envelopes::delete_envelope(&tx, envelope_id)?;

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnvelopeRow;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_envelope(marker: u8) -> EnvelopeRow {
        EnvelopeRow {
            version: "v1".to_string(),
            kdf: "pbkdf2".to_string(),
            iterations: Some(210_000),
            salt: Some(vec![marker; 16]),
            nonce: vec![marker; 12],
            ciphertext: vec![marker; 48],
        }
    }

    fn make_new(client_id: &str) -> NewApiKey {
        NewApiKey {
            app: "reporting".to_string(),
            environment: "UAT".to_string(),
            client_id: client_id.to_string(),
            server: Some("10.0.0.5".to_string()),
            updated_by: "carol".to_string(),
            envelope: make_envelope(1),
        }
    }

    #[tokio::test]
    async fn create_and_get_api_key() {
        let (db, _dir) = setup_db().await;

        let id = create_api_key(&db, make_new("client-abc")).await.unwrap();
        let key = get_api_key(&db, id).await.unwrap().unwrap();

        assert_eq!(key.client_id, "client-abc");
        assert_eq!(key.app, "reporting");
        assert_eq!(key.server.as_deref(), Some("10.0.0.5"));
        assert!(key.envelope_id > 0);

        assert!(exists_by_app_environment(&db, "reporting", "UAT")
            .await
            .unwrap());
        assert!(!exists_by_app_environment(&db, "reporting", "PROD")
            .await
            .unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_by_client_id_works() {
        let (db, _dir) = setup_db().await;

        let id = create_api_key(&db, make_new("client-xyz")).await.unwrap();
        let key = find_by_client_id(&db, "client-xyz").await.unwrap().unwrap();
        assert_eq!(key.id, id);

        assert!(find_by_client_id(&db, "no-such-client")
            .await
            .unwrap()
            .is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_client_id_is_rejected() {
        let (db, _dir) = setup_db().await;

        create_api_key(&db, make_new("dup-client")).await.unwrap();
        let mut second = make_new("dup-client");
        second.app = "other-app".to_string();
        second.environment = "DEV".to_string();
        let result = create_api_key(&db, second).await;
        assert!(result.is_err());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_app_environment_is_rejected() {
        let (db, _dir) = setup_db().await;

        create_api_key(&db, make_new("client-1")).await.unwrap();
        let result = create_api_key(&db, make_new("client-2")).await;
        assert!(result.is_err());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_without_envelope_keeps_secret() {
        let (db, _dir) = setup_db().await;

        let id = create_api_key(&db, make_new("client-upd")).await.unwrap();
        let before = get_api_key(&db, id).await.unwrap().unwrap();

        let found = update_api_key(
            &db,
            id,
            ApiKeyUpdate {
                app: "reporting".to_string(),
                environment: "UAT".to_string(),
                server: None,
                updated_by: "dave".to_string(),
                envelope: None,
            },
        )
        .await
        .unwrap();
        assert!(found);

        let after = get_api_key(&db, id).await.unwrap().unwrap();
        assert_eq!(after.envelope_id, before.envelope_id);
        assert_eq!(after.server, None);
        assert_eq!(after.updated_by, "dave");
        // client_id never changes on update.
        assert_eq!(after.client_id, "client-upd");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_with_envelope_replaces_and_cleans_up() {
        let (db, _dir) = setup_db().await;

        let id = create_api_key(&db, make_new("client-rot")).await.unwrap();
        let before = get_api_key(&db, id).await.unwrap().unwrap();

        update_api_key(
            &db,
            id,
            ApiKeyUpdate {
                app: "reporting".to_string(),
                environment: "UAT".to_string(),
                server: Some("10.0.0.5".to_string()),
                updated_by: "carol".to_string(),
                envelope: Some(make_envelope(2)),
            },
        )
        .await
        .unwrap();

        let after = get_api_key(&db, id).await.unwrap().unwrap();
        assert_ne!(after.envelope_id, before.envelope_id);

        // Old envelope row is gone.
        let old = crate::queries::envelopes::get_envelope(&db, before.envelope_id)
            .await
            .unwrap();
        assert!(old.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_unknown_id_returns_false() {
        let (db, _dir) = setup_db().await;
        let found = update_api_key(
            &db,
            9999,
            ApiKeyUpdate {
                app: "x".to_string(),
                environment: "DEV".to_string(),
                server: None,
                updated_by: "nobody".to_string(),
                envelope: None,
            },
        )
        .await
        .unwrap();
        assert!(!found);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_key_and_envelope() {
        let (db, _dir) = setup_db().await;

        let id = create_api_key(&db, make_new("client-del")).await.unwrap();
        let key = get_api_key(&db, id).await.unwrap().unwrap();

        assert!(delete_api_key(&db, id).await.unwrap());
        assert!(get_api_key(&db, id).await.unwrap().is_none());

        let envelope = crate::queries::envelopes::get_envelope(&db, key.envelope_id)
            .await
            .unwrap();
        assert!(envelope.is_none());

        // Second delete reports missing.
        assert!(!delete_api_key(&db, id).await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_orders_by_app_then_environment() {
        let (db, _dir) = setup_db().await;

        let mut k1 = make_new("c-1");
        k1.app = "zeta".to_string();
        let mut k2 = make_new("c-2");
        k2.app = "alpha".to_string();
        create_api_key(&db, k1).await.unwrap();
        create_api_key(&db, k2).await.unwrap();

        let keys = list_api_keys(&db).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].app, "alpha");
        assert_eq!(keys[1].app, "zeta");

        db.close().await.unwrap();
    }
}
