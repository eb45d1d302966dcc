// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use mtcacg_core::MtcError;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into `MtcError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MtcError {
    MtcError::storage("sqlite call failed", e)
}

/// The single SQLite writer for the ledger file.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and brings the schema up to date.
    ///
    /// The schema is migrated on a blocking thread with a short-lived connection
    /// before the long-lived async connection is opened.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, MtcError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                MtcError::storage(format!("failed to create {}", parent.display()), e)
            })?;
        }

        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || prepare(&migrate_path, wal_mode))
            .await
            .map_err(|e| MtcError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| MtcError::storage(format!("failed to open {path}"), e))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "ledger database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

fn prepare(path: &str, wal_mode: bool) -> Result<(), MtcError> {
    let mut conn = rusqlite::Connection::open(path)
        .map_err(|e| MtcError::storage(format!("failed to open {path}"), e))?;
    if wal_mode {
        // journal_mode returns a row, so it cannot go through execute_batch.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| MtcError::storage("failed to enable WAL", e))?;
    }
    migrations::run_migrations(&mut conn)
}
