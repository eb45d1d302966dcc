// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the MtcACG harvester.

use thiserror::Error;

/// Boxed source error carried by struct variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all adapter traits and core operations.
///
/// Every variant is scoped to the item, batch, or session that produced it.
/// None of them is fatal to the process.
#[derive(Debug, Error)]
pub enum MtcError {
    /// Configuration errors (missing token, invalid channel id, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable ledger store errors (database connection, query failure, remote API error).
    #[error("storage error: {message}")]
    Storage {
        message: String,
        source: Option<BoxError>,
    },

    /// The in-memory ledger cache has never been synced from the durable store.
    #[error("ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },

    /// The item was delivered to the target but recording it in the ledger failed.
    ///
    /// The item may be sent again on a later cycle.
    #[error("delivered {identifier} as {file_reference} but failed to record it: {source}")]
    LedgerWrite {
        identifier: String,
        file_reference: String,
        source: Box<MtcError>,
    },

    /// Transient source errors (network, timeout, rate limit, unexpected status).
    #[error("source {source_name} error: {message}")]
    Source {
        source_name: String,
        message: String,
        source: Option<BoxError>,
    },

    /// A source returned a payload that could not be parsed.
    #[error("malformed response from {source_name}: {message}")]
    Malformed {
        source_name: String,
        message: String,
    },

    /// Media download failures.
    #[error("download failed for {url}: {message}")]
    Download {
        url: String,
        message: String,
        source: Option<BoxError>,
    },

    /// The image could not be decoded or re-encoded.
    #[error("normalize error: {message}")]
    Normalize {
        message: String,
        source: Option<BoxError>,
    },

    /// The delivery target rejected or failed the send.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<BoxError>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MtcError {
    /// Builds a [`MtcError::Storage`] from any error.
    pub fn storage(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Builds a [`MtcError::Source`] without an underlying error.
    pub fn source_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying on a later cycle is expected to help.
    ///
    /// Malformed payloads and undecodable images are not retried in spirit:
    /// they recover the same way but are logged louder.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MtcError::Storage { .. }
                | MtcError::LedgerUnavailable { .. }
                | MtcError::Source { .. }
                | MtcError::Download { .. }
                | MtcError::Delivery { .. }
        )
    }
}
