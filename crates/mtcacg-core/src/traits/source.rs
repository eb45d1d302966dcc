// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source adapter trait for gallery services.

use async_trait::async_trait;

use crate::error::MtcError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Batch, Cursor, Entry};

/// A gallery service that produces candidate content.
///
/// Implementations own pagination, auth headers, and source-specific JSON
/// shapes. The generic poller drives them.
#[async_trait]
pub trait SourceAdapter: PluginAdapter {
    /// Fetches the batch at `cursor`.
    ///
    /// Transient failures return `Err`; an empty [`Batch`] means the source
    /// is exhausted for this cycle.
    async fn fetch_batch(&self, cursor: &Cursor) -> Result<Batch, MtcError>;

    /// Describes a deferred candidate. `Ok(None)` means the candidate turned
    /// out to be undeliverable (e.g. an animation) and should be skipped.
    async fn expand(&self, token: &str) -> Result<Option<Entry>, MtcError> {
        let _ = token;
        Ok(None)
    }
}
