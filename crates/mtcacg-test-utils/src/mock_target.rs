// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery target capturing sent photos for assertion in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use mtcacg_core::{
    AdapterType, DeliveryTarget, FileReference, HealthStatus, MtcError, PhotoInput,
    PluginAdapter, SentPhoto,
};

/// One captured `send_photo` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub photo: PhotoInput,
    pub caption: String,
    pub message_id: i64,
    pub file_reference: FileReference,
}

/// A delivery target that records every accepted photo.
///
/// Message ids start at 100 and increase by one per accepted send. Uploads
/// get the file reference `file-<message id>`; re-sends keep their handle.
pub struct MockTarget {
    sent: Arc<Mutex<Vec<SentRecord>>>,
    next_message_id: AtomicI64,
    failing: AtomicBool,
    max_payload_bytes: usize,
}

impl MockTarget {
    pub fn new() -> Self {
        Self::with_max_payload(9 * 1024 * 1024)
    }

    pub fn with_max_payload(max_payload_bytes: usize) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            next_message_id: AtomicI64::new(100),
            failing: AtomicBool::new(false),
            max_payload_bytes,
        }
    }

    /// Makes every following send fail until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn captions(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|record| record.caption.clone())
            .collect()
    }
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTarget {
    fn name(&self) -> &str {
        "mock-target"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl DeliveryTarget for MockTarget {
    fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    async fn send_photo(&self, photo: PhotoInput, caption: &str) -> Result<SentPhoto, MtcError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MtcError::Delivery {
                message: "mock target is failing".into(),
                source: None,
            });
        }

        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let file_reference = match &photo {
            PhotoInput::Upload { .. } => FileReference(format!("file-{message_id}")),
            PhotoInput::Existing(existing) => existing.clone(),
        };

        self.sent.lock().await.push(SentRecord {
            photo,
            caption: caption.to_string(),
            message_id,
            file_reference: file_reference.clone(),
        });

        Ok(SentPhoto {
            file_reference,
            message_id,
        })
    }
}
