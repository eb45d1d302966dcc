// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ledger store with failure injection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use mtcacg_core::{
    AdapterType, HealthStatus, HistoryEntry, Identifier, LedgerStore, MtcError, PluginAdapter,
};

/// A durable-store stand-in backed by a map.
///
/// Insert-or-ignore semantics match the real stores: the first writer wins.
#[derive(Default)]
pub struct MemoryLedgerStore {
    rows: Arc<Mutex<BTreeMap<Identifier, HistoryEntry>>>,
    fail_loads: AtomicBool,
    fail_inserts: AtomicBool,
    load_calls: AtomicUsize,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds rows for `identifiers`.
    pub fn with_identifiers(identifiers: &[&str]) -> Self {
        let store = Self::new();
        if let Ok(mut rows) = store.rows.try_lock() {
            for id in identifiers {
                let identifier = Identifier::from(*id);
                rows.insert(
                    identifier.clone(),
                    HistoryEntry {
                        identifier,
                        file_reference: mtcacg_core::FileReference(format!("seed-{id}")),
                        caption: String::new(),
                        tags: String::new(),
                        created_at: 0,
                        width: 0,
                        height: 0,
                    },
                );
            }
        }
        store
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, identifier: &str) -> Option<HistoryEntry> {
        self.rows
            .lock()
            .await
            .get(&Identifier::from(identifier))
            .cloned()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MemoryLedgerStore {
    fn name(&self) -> &str {
        "memory-ledger"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Ok(HealthStatus::Unhealthy("loads are failing".into()));
        }
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load_identifiers(&self) -> Result<Vec<Identifier>, MtcError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(MtcError::Storage {
                message: "memory store load failure".into(),
                source: None,
            });
        }
        Ok(self.rows.lock().await.keys().cloned().collect())
    }

    async fn insert_or_ignore(&self, entry: &HistoryEntry) -> Result<bool, MtcError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(MtcError::Storage {
                message: "memory store insert failure".into(),
                source: None,
            });
        }
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&entry.identifier) {
            return Ok(false);
        }
        rows.insert(entry.identifier.clone(), entry.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, caption: &str) -> HistoryEntry {
        HistoryEntry {
            identifier: Identifier::from(id),
            file_reference: mtcacg_core::FileReference("f".into()),
            caption: caption.into(),
            tags: String::new(),
            created_at: 1,
            width: 0,
            height: 0,
        }
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let store = MemoryLedgerStore::new();
        assert!(store.insert_or_ignore(&entry("a", "first")).await.unwrap());
        assert!(!store.insert_or_ignore(&entry("a", "second")).await.unwrap());
        assert_eq!(store.get("a").await.unwrap().caption, "first");
    }

    #[tokio::test]
    async fn seeded_identifiers_are_loaded() {
        let store = MemoryLedgerStore::with_identifiers(&["yande_1", "pixiv_2_p0"]);
        let ids = store.load_identifiers().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.load_calls(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_storage_errors() {
        let store = MemoryLedgerStore::new();
        store.set_fail_loads(true);
        store.set_fail_inserts(true);
        assert!(matches!(
            store.load_identifiers().await,
            Err(MtcError::Storage { .. })
        ));
        assert!(store.insert_or_ignore(&entry("a", "c")).await.is_err());
    }
}
