// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mirror of the durable ledger.
//!
//! The [`HistoryLedger`] is the only component allowed to say an identifier
//! has been delivered. It keeps every known identifier in a mutex-guarded set
//! shared by all pollers and the manual session flow, and writes through to
//! the durable [`LedgerStore`] before touching the cache.
//!
//! Deliveries go through a [`DeliveryClaim`]: claiming atomically checks that
//! the identifier is neither delivered nor being delivered by another task and
//! marks it in flight. The claim is consumed by [`HistoryLedger::record`] or
//! released when dropped, so a failed attempt can be retried on a later cycle.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use mtcacg_core::{HistoryEntry, Identifier, LedgerStore, MtcError};

#[derive(Debug, Default)]
struct LedgerState {
    delivered: HashSet<Identifier>,
    in_flight: HashSet<Identifier>,
    synced: bool,
}

fn lock(state: &Mutex<LedgerState>) -> MutexGuard<'_, LedgerState> {
    // The guarded sets stay consistent across a panic, so poisoning is ignored.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive right to deliver one identifier.
///
/// Dropping the claim without recording releases the identifier.
#[derive(Debug)]
pub struct DeliveryClaim {
    identifier: Identifier,
    state: Arc<Mutex<LedgerState>>,
}

impl Drop for DeliveryClaim {
    fn drop(&mut self) {
        lock(&self.state).in_flight.remove(&self.identifier);
    }
}

/// Deduplicated registry of delivered identifiers.
#[derive(Clone)]
pub struct HistoryLedger {
    store: Arc<dyn LedgerStore>,
    state: Arc<Mutex<LedgerState>>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(LedgerState::default())),
        }
    }

    /// Bulk-loads every identifier from the durable store into the cache.
    ///
    /// This is the only bulk read. Identifiers recorded locally before the
    /// sync are kept. Returns the number of identifiers loaded.
    pub async fn sync_from_remote(&self) -> Result<usize, MtcError> {
        let identifiers = self.store.load_identifiers().await?;
        let count = identifiers.len();

        let mut state = lock(&self.state);
        state.delivered.extend(identifiers);
        state.synced = true;
        info!(
            store = self.store.name(),
            loaded = count,
            cached = state.delivered.len(),
            "ledger synced from durable store"
        );
        Ok(count)
    }

    /// Syncs unless a sync has already succeeded.
    pub async fn ensure_synced(&self) -> Result<(), MtcError> {
        if self.is_synced() {
            return Ok(());
        }
        self.sync_from_remote().await.map(|_| ())
    }

    pub fn is_synced(&self) -> bool {
        lock(&self.state).synced
    }

    /// Whether `identifier` has been delivered.
    ///
    /// Returns [`MtcError::LedgerUnavailable`] until the cache has been synced,
    /// so callers skip rather than risk a duplicate.
    pub fn exists(&self, identifier: &Identifier) -> Result<bool, MtcError> {
        let state = lock(&self.state);
        if !state.synced {
            return Err(MtcError::LedgerUnavailable {
                reason: "ledger has not been synced from the durable store".into(),
            });
        }
        Ok(state.delivered.contains(identifier))
    }

    /// Claims `identifier` for delivery.
    ///
    /// Returns `Ok(None)` when it is already delivered or claimed by another
    /// task. The check and the in-flight mark happen under one lock.
    pub fn claim(&self, identifier: &Identifier) -> Result<Option<DeliveryClaim>, MtcError> {
        let mut state = lock(&self.state);
        if !state.synced {
            return Err(MtcError::LedgerUnavailable {
                reason: "ledger has not been synced from the durable store".into(),
            });
        }
        if state.delivered.contains(identifier) || !state.in_flight.insert(identifier.clone()) {
            return Ok(None);
        }
        Ok(Some(DeliveryClaim {
            identifier: identifier.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    /// Records a claimed delivery.
    ///
    /// The durable write happens first; the cache is only updated once it
    /// succeeds. On failure the claim is released and the error returned.
    pub async fn record(&self, claim: DeliveryClaim, entry: HistoryEntry) -> Result<(), MtcError> {
        if claim.identifier != entry.identifier {
            return Err(MtcError::Internal(format!(
                "claim for {} used to record {}",
                claim.identifier, entry.identifier
            )));
        }
        self.write_through(entry).await
        // `claim` drops here and clears the in-flight mark.
    }

    /// Records `entry` without a prior claim.
    ///
    /// Idempotent: an identifier that is already cached is a successful no-op.
    pub async fn record_entry(&self, entry: HistoryEntry) -> Result<(), MtcError> {
        if lock(&self.state).delivered.contains(&entry.identifier) {
            debug!(identifier = %entry.identifier, "already recorded");
            return Ok(());
        }
        self.write_through(entry).await
    }

    async fn write_through(&self, entry: HistoryEntry) -> Result<(), MtcError> {
        let inserted = self.store.insert_or_ignore(&entry).await.inspect_err(|e| {
            warn!(identifier = %entry.identifier, error = %e, "durable ledger write failed");
        })?;
        if !inserted {
            debug!(identifier = %entry.identifier, "durable store already had identifier");
        }
        lock(&self.state).delivered.insert(entry.identifier);
        Ok(())
    }
}
