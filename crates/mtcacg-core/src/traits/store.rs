// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable ledger store trait.

use async_trait::async_trait;

use crate::error::MtcError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{HistoryEntry, Identifier};

/// Durable backing store of the history ledger.
///
/// Only two idempotent operations are required: a bulk read of every known
/// identifier and an insert-or-ignore of one entry.
#[async_trait]
pub trait LedgerStore: PluginAdapter {
    /// Returns every identifier ever recorded.
    async fn load_identifiers(&self) -> Result<Vec<Identifier>, MtcError>;

    /// Inserts `entry` unless its identifier already exists.
    ///
    /// Returns `true` when a row was written, `false` when it was ignored.
    async fn insert_or_ignore(&self, entry: &HistoryEntry) -> Result<bool, MtcError>;
}
