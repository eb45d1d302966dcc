// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by sources, the delivery pipeline, the ledger, and the
//! manual session machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Globally unique, source-namespaced content identifier.
///
/// Formatted as `<namespace>_<nativeId>` with an optional `_p<index>` suffix
/// for sub-items of a family. This is the single dedup key of the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(pub String);

impl Identifier {
    /// `<namespace>_<native>`, e.g. `yande_1234`.
    pub fn new(namespace: &str, native: impl fmt::Display) -> Self {
        Self(format!("{namespace}_{native}"))
    }

    /// `<namespace>_<native>_p<page>`, e.g. `pixiv_1234_p0`.
    pub fn page(namespace: &str, native: impl fmt::Display, page: usize) -> Self {
        Self(format!("{namespace}_{native}_p{page}"))
    }

    /// Identifier assigned to a manual upload once the channel has accepted it.
    pub fn manual(message_id: i64) -> Self {
        Self::new("manual", message_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque handle returned by the delivery target for an uploaded photo.
///
/// Re-sending with this handle does not re-upload the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference(pub String);

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the bytes of a content item come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// Fetched lazily by the pipeline.
    Remote {
        url: String,
        /// `Referer` header some hosts require for hotlink protection.
        referer: Option<String>,
    },
    /// Already held by the delivery target.
    Existing(FileReference),
}

/// Position of a sub-item inside its family, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyPosition {
    pub index: usize,
    pub total: usize,
}

/// One deliverable unit produced by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub identifier: Identifier,
    /// Name of the source that produced the item (`yande`, `pixiv`, ...).
    pub source_name: String,
    /// First word of the caption, e.g. `Pixiv` or `Yande Set`.
    pub label: String,
    pub title: String,
    pub attribution: String,
    pub tags: Vec<String>,
    /// How many of `tags` the caption shows; all of them when `None`.
    pub caption_tag_limit: Option<usize>,
    /// 0 when unknown.
    pub width: u32,
    /// 0 when unknown.
    pub height: u32,
    pub media: MediaSource,
    /// Set by [`ContentFamily::new`] for family members.
    pub position: Option<FamilyPosition>,
}

impl ContentItem {
    /// Creates an item with empty metadata; sources fill in the rest.
    pub fn new(identifier: Identifier, source_name: &str, media: MediaSource) -> Self {
        Self {
            identifier,
            source_name: source_name.to_string(),
            label: source_name.to_string(),
            title: String::new(),
            attribution: String::new(),
            tags: Vec::new(),
            caption_tag_limit: None,
            width: 0,
            height: 0,
            media,
            position: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_caption_tag_limit(mut self, limit: usize) -> Self {
        self.caption_tag_limit = Some(limit);
        self
    }

    /// The leading tags the caption renders.
    pub fn caption_tags(&self) -> &[String] {
        match self.caption_tag_limit {
            Some(limit) => &self.tags[..limit.min(self.tags.len())],
            None => &self.tags,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Ordered sub-items sharing one parent artwork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFamily {
    pub parent: String,
    pub items: Vec<ContentItem>,
}

impl ContentFamily {
    /// Builds a family and stamps each item with its `[i/N]` position.
    pub fn new(parent: impl Into<String>, mut items: Vec<ContentItem>) -> Self {
        let total = items.len();
        for (index, item) in items.iter_mut().enumerate() {
            item.position = Some(FamilyPosition { index, total });
        }
        Self {
            parent: parent.into(),
            items,
        }
    }
}

/// A fully described unit of work: a single item or a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Single(ContentItem),
    Family(ContentFamily),
}

impl Entry {
    /// Items in delivery order.
    pub fn items(&self) -> &[ContentItem] {
        match self {
            Entry::Single(item) => std::slice::from_ref(item),
            Entry::Family(family) => &family.items,
        }
    }

    pub fn into_items(self) -> Vec<ContentItem> {
        match self {
            Entry::Single(item) => vec![item],
            Entry::Family(family) => family.items,
        }
    }
}

/// One element of a fetched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// The source already knows everything about the entry.
    Ready(Entry),
    /// The source needs a second call ([`crate::SourceAdapter::expand`]) to
    /// describe the entry. `probe` is set only when a recorded probe proves
    /// the whole entry was delivered.
    Deferred {
        probe: Option<Identifier>,
        token: String,
    },
}

impl Candidate {
    /// Identifier whose presence in the ledger means the candidate can be
    /// skipped before any expansion or download.
    ///
    /// Families have no probe: a family interrupted halfway must still
    /// deliver its remaining items.
    pub fn probe(&self) -> Option<&Identifier> {
        match self {
            Candidate::Ready(Entry::Single(item)) => Some(&item.identifier),
            Candidate::Ready(Entry::Family(_)) => None,
            Candidate::Deferred { probe, .. } => probe.as_ref(),
        }
    }
}

/// Opaque, source-defined position inside a poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor(pub Option<String>);

impl Cursor {
    /// The position at the start of a cycle.
    pub fn start() -> Self {
        Self(None)
    }

    pub fn at(position: impl Into<String>) -> Self {
        Self(Some(position.into()))
    }

    pub fn position(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// The result of one `fetch_batch` call.
///
/// An empty batch means "exhausted for now", never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub candidates: Vec<Candidate>,
    /// Where the next call should continue; `None` ends the cycle.
    pub next: Option<Cursor>,
    pub quota: Option<Quota>,
}

/// Delivery cap shared by consecutive batches of the same `group`.
///
/// Once `limit` items of the group have been delivered in a cycle, the
/// poller stops reading the group and continues at `then` instead of the
/// batch's `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quota {
    pub group: String,
    pub limit: usize,
    pub then: Option<Cursor>,
}

impl Batch {
    pub fn new(candidates: Vec<Candidate>, next: Option<Cursor>) -> Self {
        Self {
            candidates,
            next,
            quota: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn last(candidates: Vec<Candidate>) -> Self {
        Self::new(candidates, None)
    }

    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A durable record of one delivered identifier.
///
/// Created exactly once per identifier and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub identifier: Identifier,
    pub file_reference: FileReference,
    pub caption: String,
    /// Space separated tags followed by the source name.
    pub tags: String,
    /// Epoch seconds.
    pub created_at: i64,
    pub width: u32,
    pub height: u32,
}

/// Photo payload handed to a delivery target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoInput {
    Upload { bytes: Vec<u8>, file_name: String },
    Existing(FileReference),
}

/// What the delivery target returns for an accepted photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPhoto {
    pub file_reference: FileReference,
    pub message_id: i64,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Source,
    Delivery,
    Ledger,
    Fetcher,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> ContentItem {
        ContentItem::new(
            Identifier::from(id),
            "yande",
            MediaSource::Remote {
                url: format!("https://example.test/{id}.jpg"),
                referer: None,
            },
        )
    }

    #[test]
    fn identifiers_are_namespaced() {
        assert_eq!(Identifier::new("yande", 42).as_str(), "yande_42");
        assert_eq!(Identifier::page("pixiv", 42, 3).as_str(), "pixiv_42_p3");
        assert_eq!(Identifier::manual(7).as_str(), "manual_7");
        assert_ne!(Identifier::new("yande", 42), Identifier::new("manyacg", 42));
    }

    #[test]
    fn family_stamps_positions_in_order() {
        let family = ContentFamily::new("100", vec![item("a"), item("b"), item("c")]);
        let positions: Vec<_> = family
            .items
            .iter()
            .map(|i| i.position.expect("position set"))
            .collect();
        assert_eq!(positions[0], FamilyPosition { index: 0, total: 3 });
        assert_eq!(positions[2], FamilyPosition { index: 2, total: 3 });
    }

    #[test]
    fn only_single_entries_and_explicit_probes_are_probed() {
        let family = Candidate::Ready(Entry::Family(ContentFamily::new(
            "9",
            vec![item("x_p0"), item("x_p1")],
        )));
        assert_eq!(family.probe(), None);

        let single = Candidate::Ready(Entry::Single(item("x")));
        assert_eq!(single.probe().map(Identifier::as_str), Some("x"));

        let deferred = Candidate::Deferred {
            probe: Some(Identifier::from("yande_5")),
            token: "5".into(),
        };
        assert_eq!(deferred.probe().map(Identifier::as_str), Some("yande_5"));
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;
        for variant in [
            AdapterType::Source,
            AdapterType::Delivery,
            AdapterType::Ledger,
            AdapterType::Fetcher,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse");
            assert_eq!(parsed, variant);
        }
    }
}
