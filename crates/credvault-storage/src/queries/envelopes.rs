// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cipher envelope persistence.
//!
//! Envelope rows are written inside the same transaction as the credential
//! or API key that owns them; the synchronous helpers here take a plain
//! `rusqlite::Connection` so callers can pass a transaction.

use credvault_core::VaultError;
use rusqlite::params;

use crate::database::Database;
use crate::models::EnvelopeRow;

/// Insert an envelope row. Returns the auto-generated envelope ID.
///
/// Runs on the caller's connection (usually a transaction).
pub(crate) fn insert_envelope(
    conn: &rusqlite::Connection,
    envelope: &EnvelopeRow,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO cipher_envelope (version, kdf, iterations, salt, nonce, ciphertext)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            envelope.version,
            envelope.kdf,
            envelope.iterations,
            envelope.salt,
            envelope.nonce,
            envelope.ciphertext,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete an envelope row by ID.
pub(crate) fn delete_envelope(
    conn: &rusqlite::Connection,
    id: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM cipher_envelope WHERE id = ?1", params![id])?;
    Ok(())
}

/// Fetch an envelope by ID.
pub async fn get_envelope(db: &Database, id: i64) -> Result<Option<EnvelopeRow>, VaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT version, kdf, iterations, salt, nonce, ciphertext
                 FROM cipher_envelope WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(EnvelopeRow {
                    version: row.get(0)?,
                    kdf: row.get(1)?,
                    iterations: row.get(2)?,
                    salt: row.get(3)?,
                    nonce: row.get(4)?,
                    ciphertext: row.get(5)?,
                })
            });
            match result {
                Ok(envelope) => Ok(Some(envelope)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
