// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential version chain operations.
//!
//! Chains are append-only: updating a credential inserts a new node and
//! links the old latest to it via `next_id`. The append itself is guarded
//! by a compare-and-swap on `next_id IS NULL`, so two concurrent updates
//! of the same node produce exactly one winner.

use credvault_core::VaultError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Credential, CredentialUpdate, NewCredential, SupersedeOutcome};
use crate::queries::envelopes;

fn row_to_credential(row: &rusqlite::Row<'_>) -> Result<Credential, rusqlite::Error> {
    Ok(Credential {
        id: row.get(0)?,
        next_id: row.get(1)?,
        envelope_id: row.get(2)?,
        app: row.get(3)?,
        environment: row.get(4)?,
        credential_type: row.get(5)?,
        username: row.get(6)?,
        version: row.get(7)?,
        enabled: row.get(8)?,
        url: row.get(9)?,
        notes: row.get(10)?,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
    })
}

const CREDENTIAL_COLUMNS: &str = "id, next_id, envelope_id, app, environment, credential_type,
     username, version, enabled, url, notes, created_by, created_at";

/// Create the first version of a new credential chain.
///
/// Inserts the envelope and the chain head (version 1, enabled) in one
/// transaction. Returns the new credential ID.
pub async fn create_credential(db: &Database, new: NewCredential) -> Result<i64, VaultError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let tx = conn.transaction()?;
            let envelope_id = envelopes::insert_envelope(&tx, &new.envelope)?;
            tx.execute(
                "INSERT INTO credential
                     (next_id, envelope_id, app, environment, credential_type,
                      username, version, enabled, url, notes, created_by)
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, 1, 1, ?6, ?7, ?8)",
                params![
                    envelope_id,
                    new.app,
                    new.environment,
                    new.credential_type,
                    new.username,
                    new.url,
                    new.notes,
                    new.created_by,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a credential node by ID.
pub async fn get_credential(db: &Database, id: i64) -> Result<Option<Credential>, VaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credential WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_credential);
            match result {
                Ok(credential) => Ok(Some(credential)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the latest enabled version of a chain by its lookup coordinates.
///
/// Disabled latest nodes are not returned: a soft-deleted credential is
/// invisible to lookups until re-enabled.
pub async fn find_latest(
    db: &Database,
    app: &str,
    environment: &str,
    credential_type: &str,
    username: &str,
) -> Result<Option<Credential>, VaultError> {
    let app = app.to_string();
    let environment = environment.to_string();
    let credential_type = credential_type.to_string();
    let username = username.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credential
                 WHERE next_id IS NULL AND enabled = 1
                   AND app = ?1 AND environment = ?2
                   AND credential_type = ?3 AND username = ?4"
            ))?;
            let result = stmt.query_row(
                params![app, environment, credential_type, username],
                row_to_credential,
            );
            match result {
                Ok(credential) => Ok(Some(credential)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a new version to the chain, superseding `old_id`.
///
/// Runs in a single transaction:
/// 1. Read the old node; missing -> `NotFound`.
/// 2. Old node already has a successor -> `NotLatest`.
/// 3. Insert the new envelope and node (version + 1, username copied,
///    enabled forced on).
/// 4. CAS-link: `UPDATE ... WHERE id = old AND next_id IS NULL`. Zero rows
///    means a concurrent update won the race; the transaction rolls back
///    and the result is `NotLatest`.
pub async fn supersede_credential(
    db: &Database,
    old_id: i64,
    update: CredentialUpdate,
) -> Result<SupersedeOutcome, VaultError> {
    db.connection()
        .call(move |conn| -> Result<SupersedeOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;

            let old = tx.query_row(
                "SELECT next_id, version, username FROM credential WHERE id = ?1",
                params![old_id],
                |row| {
                    Ok((
                        row.get::<_, Option<i64>>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            );
            let (next_id, version, username) = match old {
                Ok(node) => node,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Ok(SupersedeOutcome::NotFound);
                }
                Err(e) => return Err(e),
            };
            if next_id.is_some() {
                return Ok(SupersedeOutcome::NotLatest);
            }

            let envelope_id = envelopes::insert_envelope(&tx, &update.envelope)?;
            tx.execute(
                "INSERT INTO credential
                     (next_id, envelope_id, app, environment, credential_type,
                      username, version, enabled, url, notes, created_by)
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9)",
                params![
                    envelope_id,
                    update.app,
                    update.environment,
                    update.credential_type,
                    username,
                    version + 1,
                    update.url,
                    update.notes,
                    update.created_by,
                ],
            )?;
            let new_id = tx.last_insert_rowid();

            let claimed = tx.execute(
                "UPDATE credential SET next_id = ?1 WHERE id = ?2 AND next_id IS NULL",
                params![new_id, old_id],
            )?;
            if claimed != 1 {
                // Lost the race; dropping the transaction rolls back the insert.
                return Ok(SupersedeOutcome::NotLatest);
            }

            tx.commit()?;
            Ok(SupersedeOutcome::Superseded(new_id))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the node whose `next_id` points at `id`, i.e. the version that `id`
/// superseded.
pub async fn find_predecessor(db: &Database, id: i64) -> Result<Option<Credential>, VaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credential WHERE next_id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_credential);
            match result {
                Ok(credential) => Ok(Some(credential)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Toggle a node's enabled flag. Returns `false` if the ID does not exist.
pub async fn set_enabled(db: &Database, id: i64, enabled: bool) -> Result<bool, VaultError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE credential SET enabled = ?1 WHERE id = ?2",
                params![enabled, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Walk the chain backwards from `id`: the node itself, then each
/// predecessor, newest first. Empty if the ID does not exist.
///
/// Successors of `id` are deliberately excluded; history is what led up to
/// a node, not the whole chain.
pub async fn credential_history(db: &Database, id: i64) -> Result<Vec<Credential>, VaultError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Credential>, rusqlite::Error> {
            let mut chain = Vec::new();

            let head = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CREDENTIAL_COLUMNS} FROM credential WHERE id = ?1"
                ))?;
                stmt.query_row(params![id], row_to_credential)
            };
            match head {
                Ok(node) => chain.push(node),
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(chain),
                Err(e) => return Err(e),
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credential WHERE next_id = ?1"
            ))?;
            let mut cursor = id;
            loop {
                match stmt.query_row(params![cursor], row_to_credential) {
                    Ok(prev) => {
                        cursor = prev.id;
                        chain.push(prev);
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => break,
                    Err(e) => return Err(e),
                }
            }

            Ok(chain)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
