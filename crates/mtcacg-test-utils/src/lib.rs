// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for MtcACG integration tests.
//!
//! Provides mock adapters for fast, deterministic tests without Telegram,
//! gallery sites, or a real ledger database.
//!
//! # Components
//!
//! - [`MockSource`] - Scripted batches, expansions and fetch failures
//! - [`MockTarget`] - Delivery target that captures every sent photo
//! - [`MemoryLedgerStore`] - In-memory durable store with failure injection
//! - [`MockFetcher`] - Media fetcher serving canned bytes per URL

pub mod mock_fetcher;
pub mod mock_source;
pub mod mock_store;
pub mod mock_target;

pub use mock_fetcher::MockFetcher;
pub use mock_source::{MockSource, ScriptStep};
pub use mock_store::MemoryLedgerStore;
pub use mock_target::{MockTarget, SentRecord};
