// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedup, download, normalize, send and record for a single content item.
//!
//! Each [`DeliveryPipeline::deliver`] call is one attempt with no internal
//! retry. A failure at any stage ends the attempt for that item only; the
//! next poll cycle retries it because the ledger never saw it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use mtcacg_core::{
    ContentItem, DeliveryTarget, FileReference, HistoryEntry, Identifier, MediaFetcher,
    MediaSource, MtcError, PhotoInput, SentPhoto,
};
use mtcacg_storage::HistoryLedger;

use crate::caption::{render_caption, stored_tags, truncate_chars};
use crate::normalize::{SizeNormalizer, probe_dimensions};
use crate::recording;

/// Why an item was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDelivered,
    /// Another task holds the claim for this identifier.
    InFlight,
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Skipped {
        reason: SkipReason,
    },
    Delivered {
        file_reference: FileReference,
        message_id: i64,
    },
}

/// A confirmed manual upload ready to be forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualDelivery {
    /// Handle of the photo the human sent to the bot.
    pub file_reference: FileReference,
    pub caption: String,
    /// Selected tag set, e.g. `#TGC #SFW`.
    pub tags: String,
    pub width: u32,
    pub height: u32,
}

/// Source name recorded for manual uploads.
pub const MANUAL_SOURCE: &str = "manual";

pub struct DeliveryPipeline {
    ledger: HistoryLedger,
    target: Arc<dyn DeliveryTarget>,
    fetcher: Arc<dyn MediaFetcher>,
    normalizer: SizeNormalizer,
    caption_limit: usize,
}

impl DeliveryPipeline {
    pub fn new(
        ledger: HistoryLedger,
        target: Arc<dyn DeliveryTarget>,
        fetcher: Arc<dyn MediaFetcher>,
        normalizer: SizeNormalizer,
        caption_limit: usize,
    ) -> Self {
        Self {
            ledger,
            target,
            fetcher,
            normalizer,
            caption_limit,
        }
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Delivers `item` unless the ledger already knows it.
    ///
    /// If the send succeeds but recording fails, returns
    /// [`MtcError::LedgerWrite`]: the item is out but may be sent again.
    pub async fn deliver(&self, item: &ContentItem) -> Result<DeliveryOutcome, MtcError> {
        let identifier = &item.identifier;
        let source = item.source_name.as_str();

        if self.ledger.exists(identifier)? {
            debug!(%identifier, source, "already delivered");
            recording::record_skipped(source);
            return Ok(DeliveryOutcome::Skipped {
                reason: SkipReason::AlreadyDelivered,
            });
        }
        let Some(claim) = self.ledger.claim(identifier)? else {
            debug!(%identifier, source, "delivery in flight elsewhere");
            recording::record_skipped(source);
            return Ok(DeliveryOutcome::Skipped {
                reason: SkipReason::InFlight,
            });
        };

        let (photo, width, height) = self.prepare(item).await.inspect_err(|e| {
            warn!(%identifier, source, error = %e, "failed to acquire media");
            recording::record_failed(source, "download");
        })?;

        let caption = render_caption(item, self.caption_limit);
        let sent = self
            .target
            .send_photo(photo, &caption)
            .await
            .inspect_err(|e| {
                warn!(%identifier, source, error = %e, "delivery target rejected item");
                recording::record_failed(source, "deliver");
            })?;

        let entry = HistoryEntry {
            identifier: identifier.clone(),
            file_reference: sent.file_reference.clone(),
            caption,
            tags: stored_tags(item),
            created_at: chrono::Utc::now().timestamp(),
            width,
            height,
        };
        if let Err(e) = self.ledger.record(claim, entry).await {
            recording::record_failed(source, "record");
            return Err(MtcError::LedgerWrite {
                identifier: identifier.to_string(),
                file_reference: sent.file_reference.to_string(),
                source: Box::new(e),
            });
        }

        info!(
            %identifier,
            source,
            file_reference = %sent.file_reference,
            message_id = sent.message_id,
            "delivered"
        );
        recording::record_delivered(source);
        Ok(DeliveryOutcome::Delivered {
            file_reference: sent.file_reference,
            message_id: sent.message_id,
        })
    }

    /// Turns the item's media into a photo payload plus final dimensions.
    async fn prepare(&self, item: &ContentItem) -> Result<(PhotoInput, u32, u32), MtcError> {
        let bytes = match &item.media {
            MediaSource::Existing(reference) => {
                return Ok((
                    PhotoInput::Existing(reference.clone()),
                    item.width,
                    item.height,
                ));
            }
            MediaSource::Bytes(bytes) => bytes.clone(),
            MediaSource::Remote { url, referer } => {
                self.fetcher.fetch(url, referer.as_deref()).await?
            }
        };

        let (mut width, mut height) = (item.width, item.height);
        if width == 0 || height == 0 {
            if let Some((w, h)) = probe_dimensions(&bytes) {
                (width, height) = (w, h);
            }
        }

        let bytes = self.normalize(&item.identifier, bytes).await?;
        Ok((
            PhotoInput::Upload {
                bytes,
                file_name: format!("{}.jpg", item.source_name),
            },
            width,
            height,
        ))
    }

    /// Normalizes off the async runtime; falls back to the original bytes
    /// when the image cannot be decoded.
    async fn normalize(&self, identifier: &Identifier, bytes: Vec<u8>) -> Result<Vec<u8>, MtcError> {
        let max_bytes = self.target.max_payload_bytes();
        if bytes.len() <= max_bytes {
            return Ok(bytes);
        }

        let normalizer = self.normalizer;
        let (original, result) = tokio::task::spawn_blocking(move || {
            let result = normalizer.normalize(&bytes, max_bytes);
            (bytes, result)
        })
        .await
        .map_err(|e| MtcError::Internal(format!("normalize task failed: {e}")))?;

        match result {
            Ok(normalized) => Ok(normalized.into_bytes(original)),
            Err(e) => {
                warn!(%identifier, error = %e, size = original.len(), "sending original bytes");
                Ok(original)
            }
        }
    }

    /// Forwards a confirmed manual upload by its existing handle and records
    /// it as `manual_<message id>`.
    pub async fn deliver_manual(&self, manual: &ManualDelivery) -> Result<SentPhoto, MtcError> {
        let caption = truncate_chars(
            &format!("{}\nTags: {}", manual.caption, manual.tags),
            self.caption_limit,
        );
        let sent = self
            .target
            .send_photo(PhotoInput::Existing(manual.file_reference.clone()), &caption)
            .await
            .inspect_err(|_| recording::record_failed(MANUAL_SOURCE, "deliver"))?;

        let identifier = Identifier::manual(sent.message_id);
        let entry = HistoryEntry {
            identifier: identifier.clone(),
            file_reference: sent.file_reference.clone(),
            caption: manual.caption.clone(),
            tags: format!("{} {MANUAL_SOURCE}", manual.tags),
            created_at: chrono::Utc::now().timestamp(),
            width: manual.width,
            height: manual.height,
        };
        if let Err(e) = self.ledger.record_entry(entry).await {
            recording::record_failed(MANUAL_SOURCE, "record");
            return Err(MtcError::LedgerWrite {
                identifier: identifier.to_string(),
                file_reference: sent.file_reference.to_string(),
                source: Box::new(e),
            });
        }

        info!(%identifier, file_reference = %sent.file_reference, "manual upload delivered");
        recording::record_delivered(MANUAL_SOURCE);
        Ok(sent)
    }
}
