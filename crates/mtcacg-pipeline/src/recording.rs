// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; nothing is collected unless the binary
//! installs a recorder.

use metrics::describe_counter;

/// Register all MtcACG metric descriptions.
pub fn register_metrics() {
    describe_counter!("mtcacg_items_delivered_total", "Items sent and recorded");
    describe_counter!(
        "mtcacg_items_skipped_total",
        "Items skipped because they were already delivered or in flight"
    );
    describe_counter!("mtcacg_items_failed_total", "Item deliveries that failed");
    describe_counter!("mtcacg_poll_cycles_total", "Completed poll cycles");
    describe_counter!("mtcacg_fetch_errors_total", "Failed batch fetches");
}

pub fn record_delivered(source: &str) {
    metrics::counter!("mtcacg_items_delivered_total", "source" => source.to_string()).increment(1);
}

pub fn record_skipped(source: &str) {
    metrics::counter!("mtcacg_items_skipped_total", "source" => source.to_string()).increment(1);
}

/// `stage` is one of `download`, `deliver`, `record`, `expand`.
pub fn record_failed(source: &str, stage: &'static str) {
    metrics::counter!(
        "mtcacg_items_failed_total",
        "source" => source.to_string(),
        "stage" => stage
    )
    .increment(1);
}

pub fn record_cycle(source: &str) {
    metrics::counter!("mtcacg_poll_cycles_total", "source" => source.to_string()).increment(1);
}

pub fn record_fetch_error(source: &str) {
    metrics::counter!("mtcacg_fetch_errors_total", "source" => source.to_string()).increment(1);
}
