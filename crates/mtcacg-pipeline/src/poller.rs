// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic poll loop shared by every source.
//!
//! One [`SourcePoller`] runs per enabled source as its own task. A cycle
//! walks the source's batches from [`Cursor::start`] until the source stops
//! returning a next cursor, delivering each candidate in order. Failures are
//! logged and scoped to the item or batch; the loop only ends on
//! cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mtcacg_config::PollSchedule;
use mtcacg_core::{Batch, Candidate, ContentItem, Cursor, Entry, MtcError, SourceAdapter};

use crate::pipeline::{DeliveryOutcome, DeliveryPipeline};
use crate::recording;

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub batches: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The cycle ended on a fetch or ledger error rather than exhaustion.
    pub aborted: bool,
    pub cancelled: bool,
}

/// Drives one [`SourceAdapter`] through the [`DeliveryPipeline`].
pub struct SourcePoller {
    source: Arc<dyn SourceAdapter>,
    pipeline: Arc<DeliveryPipeline>,
    schedule: PollSchedule,
}

enum Flow {
    Continue,
    Stop,
}

/// Deliveries made so far for the quota group currently being read.
#[derive(Default)]
struct GroupTally {
    group: Option<String>,
    delivered: usize,
}

impl GroupTally {
    fn enter(&mut self, group: &str) {
        if self.group.as_deref() != Some(group) {
            self.group = Some(group.to_string());
            self.delivered = 0;
        }
    }
}

impl SourcePoller {
    pub fn new(
        source: Arc<dyn SourceAdapter>,
        pipeline: Arc<DeliveryPipeline>,
        schedule: PollSchedule,
    ) -> Self {
        Self {
            source,
            pipeline,
            schedule,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Runs cycles until `cancel` fires.
    ///
    /// An aborted cycle waits `error_delay` before the next one, a completed
    /// cycle waits `cycle_delay`.
    pub async fn run(&self, cancel: CancellationToken) {
        let source = self.source.name().to_string();
        info!(source = source.as_str(), "poller started");

        while !cancel.is_cancelled() {
            let report = self.run_cycle(&cancel).await;
            if report.cancelled {
                break;
            }
            recording::record_cycle(&source);
            info!(
                source = source.as_str(),
                batches = report.batches,
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                aborted = report.aborted,
                "poll cycle finished"
            );

            let delay = if report.aborted {
                self.schedule.error_delay
            } else {
                self.schedule.cycle_delay
            };
            if !pause(&cancel, delay).await {
                break;
            }
        }

        info!(source = source.as_str(), "poller stopped");
    }

    /// Runs a single cycle.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let source = self.source.name();
        let ledger = self.pipeline.ledger();
        let mut report = CycleReport::default();

        if let Err(e) = ledger.ensure_synced().await {
            warn!(source, error = %e, "ledger not synced, skipping cycle");
            report.aborted = true;
            return report;
        }

        let mut cursor = Cursor::start();
        let mut tally = GroupTally::default();
        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return report;
            }

            let batch = match self.source.fetch_batch(&cursor).await {
                Ok(batch) => batch,
                Err(e) => {
                    log_error(source, "fetch failed", &e);
                    recording::record_fetch_error(source);
                    report.aborted = true;
                    return report;
                }
            };
            report.batches += 1;
            debug!(
                source,
                cursor = cursor.position().unwrap_or("start"),
                candidates = batch.candidates.len(),
                "fetched batch"
            );

            let Batch {
                candidates,
                mut next,
                quota,
            } = batch;
            if let Some(quota) = &quota {
                tally.enter(&quota.group);
            }
            for candidate in candidates {
                if self.cap_reached(&report) {
                    debug!(source, "delivery cap reached for this cycle");
                    return report;
                }
                if quota.as_ref().is_some_and(|q| tally.delivered >= q.limit) {
                    break;
                }
                let before = report.delivered;
                if let Flow::Stop = self.process(candidate, cancel, &mut report).await {
                    return report;
                }
                tally.delivered += report.delivered - before;
            }
            if let Some(quota) = quota
                && tally.delivered >= quota.limit
            {
                debug!(source, group = quota.group.as_str(), "group quota reached");
                next = quota.then;
            }

            match next {
                Some(next) => cursor = next,
                None => return report,
            }
        }
    }

    fn cap_reached(&self, report: &CycleReport) -> bool {
        self.schedule
            .max_deliveries_per_cycle
            .is_some_and(|cap| report.delivered >= cap)
    }

    async fn process(
        &self,
        candidate: Candidate,
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) -> Flow {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Flow::Stop;
        }
        let source = self.source.name();

        if let Some(probe) = candidate.probe() {
            match self.pipeline.ledger().exists(probe) {
                Ok(true) => {
                    debug!(source, identifier = %probe, "probe already delivered");
                    report.skipped += 1;
                    return Flow::Continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(source, error = %e, "ledger check failed");
                    report.aborted = true;
                    return Flow::Stop;
                }
            }
        }

        let entry = match candidate {
            Candidate::Ready(entry) => entry,
            Candidate::Deferred { token, .. } => match self.source.expand(&token).await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    debug!(source, token = token.as_str(), "candidate not deliverable");
                    report.skipped += 1;
                    return Flow::Continue;
                }
                Err(e) => {
                    log_error(source, "expand failed", &e);
                    recording::record_failed(source, "expand");
                    report.failed += 1;
                    return Flow::Continue;
                }
            },
        };

        match self.deliver_entry(&entry, cancel, report).await {
            (Flow::Stop, _) => Flow::Stop,
            // Only a send earns the politeness delay.
            (Flow::Continue, true) => self.item_pause(cancel, report).await,
            (Flow::Continue, false) => Flow::Continue,
        }
    }

    /// Delivers every item of `entry` in order and reports whether the target
    /// was contacted. Sibling failures do not stop the rest of the family.
    async fn deliver_entry(
        &self,
        entry: &Entry,
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) -> (Flow, bool) {
        let mut contacted = false;
        let mut sent_previous = false;
        for item in entry.items() {
            if sent_previous && !pause(cancel, self.schedule.family_item_delay).await {
                report.cancelled = true;
                return (Flow::Stop, true);
            }
            sent_previous = self.deliver_item(item, report).await;
            contacted |= sent_previous;
        }
        (Flow::Continue, contacted)
    }

    /// Returns whether the target was contacted.
    async fn deliver_item(&self, item: &ContentItem, report: &mut CycleReport) -> bool {
        match self.pipeline.deliver(item).await {
            Ok(DeliveryOutcome::Delivered { .. }) => {
                report.delivered += 1;
                true
            }
            Ok(DeliveryOutcome::Skipped { .. }) => {
                report.skipped += 1;
                false
            }
            Err(e) => {
                report.failed += 1;
                log_error(self.source.name(), "delivery failed", &e);
                matches!(e, MtcError::LedgerWrite { .. } | MtcError::Delivery { .. })
            }
        }
    }

    async fn item_pause(&self, cancel: &CancellationToken, report: &mut CycleReport) -> Flow {
        if pause(cancel, self.schedule.item_delay).await {
            Flow::Continue
        } else {
            report.cancelled = true;
            Flow::Stop
        }
    }
}

fn log_error(source: &str, what: &str, e: &MtcError) {
    if e.is_transient() {
        warn!(source, error = %e, "{what}");
    } else {
        error!(source, error = %e, "{what}");
    }
}

/// Sleeps for `delay`; returns `false` if cancelled first.
async fn pause(cancel: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
