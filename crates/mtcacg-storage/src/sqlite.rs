// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `LedgerStore` trait.

use async_trait::async_trait;
use rusqlite::params;
use tracing::debug;

use mtcacg_core::{
    AdapterType, HealthStatus, HistoryEntry, Identifier, LedgerStore, MtcError, PluginAdapter,
};

use crate::database::{Database, map_tr_err};

/// Local ledger file accessed through the single tokio-rusqlite writer.
pub struct SqliteLedgerStore {
    db: Database,
}

impl SqliteLedgerStore {
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, MtcError> {
        let db = Database::open(path, wal_mode).await?;
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteLedgerStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn load_identifiers(&self) -> Result<Vec<Identifier>, MtcError> {
        let ids = self
            .db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT id FROM images")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)?;
        debug!(count = ids.len(), "loaded ledger identifiers from sqlite");
        Ok(ids.into_iter().map(Identifier).collect())
    }

    async fn insert_or_ignore(&self, entry: &HistoryEntry) -> Result<bool, MtcError> {
        let id = entry.identifier.as_str().to_string();
        let file_name = entry.file_reference.0.clone();
        let caption = entry.caption.clone();
        let tags = entry.tags.clone();
        let created_at = entry.created_at;
        let width = entry.width;
        let height = entry.height;

        let changed = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO images (id, file_name, caption, tags, created_at, width, height) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![id, file_name, caption, tags, created_at, width, height],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }
}
