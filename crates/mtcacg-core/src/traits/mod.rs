// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod delivery;
pub mod fetch;
pub mod source;
pub mod store;

pub use adapter::PluginAdapter;
pub use delivery::DeliveryTarget;
pub use fetch::MediaFetcher;
pub use source::SourceAdapter;
pub use store::LedgerStore;
