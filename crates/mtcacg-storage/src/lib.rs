// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History ledger for the MtcACG harvester.
//!
//! The [`HistoryLedger`] mirrors every delivered identifier in memory and
//! writes through to a durable [`LedgerStore`](mtcacg_core::LedgerStore):
//! a local SQLite file ([`SqliteLedgerStore`]) or Cloudflare D1
//! ([`D1LedgerStore`]).

pub mod d1;
pub mod database;
pub mod ledger;
pub mod migrations;
pub mod sqlite;

pub use d1::D1LedgerStore;
pub use database::Database;
pub use ledger::{DeliveryClaim, HistoryLedger};
pub use sqlite::SqliteLedgerStore;

use std::sync::Arc;

use mtcacg_config::model::{LedgerBackend, LedgerConfig};
use mtcacg_core::{LedgerStore, MtcError};

/// Opens the durable store selected by `config.backend`.
pub async fn open_store(config: &LedgerConfig) -> Result<Arc<dyn LedgerStore>, MtcError> {
    match config.backend {
        LedgerBackend::Sqlite => {
            let store = SqliteLedgerStore::open(&config.database_path, config.wal_mode).await?;
            Ok(Arc::new(store))
        }
        LedgerBackend::D1 => Ok(Arc::new(D1LedgerStore::from_config(&config.d1)?)),
    }
}
