// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion, dedup and delivery for the MtcACG harvester.
//!
//! - [`SizeNormalizer`] re-encodes oversized images as JPEG at decreasing quality.
//! - [`DeliveryPipeline`] runs dedup check, download, normalize, send and record
//!   for one content item.
//! - [`SourcePoller`] drives any [`SourceAdapter`](mtcacg_core::SourceAdapter)
//!   through the pipeline on a fixed cadence until cancelled.

pub mod caption;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod poller;
pub mod recording;

pub use fetch::HttpFetcher;
pub use normalize::{Normalized, SizeNormalizer, probe_dimensions};
pub use pipeline::{DeliveryOutcome, DeliveryPipeline, ManualDelivery, SkipReason};
pub use poller::{CycleReport, SourcePoller};
