// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the MtcACG harvester.
//!
//! This crate provides the trait definitions, error type, and domain types
//! used throughout the workspace. Sources, delivery targets, ledger stores,
//! and media fetchers all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BoxError, MtcError};
pub use types::{
    AdapterType, Batch, Candidate, ContentFamily, ContentItem, Cursor, Entry, FamilyPosition,
    FileReference, HealthStatus, HistoryEntry, Identifier, MediaSource, PhotoInput, Quota,
    SentPhoto,
};

pub use traits::{DeliveryTarget, LedgerStore, MediaFetcher, PluginAdapter, SourceAdapter};
