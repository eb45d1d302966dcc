// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! pic.cosine.ren tag source.
//!
//! The site mirrors Pixiv, so its entries are identified in the Pixiv
//! namespace (`pixiv_<id>_p<n>`) and dedup against the Pixiv source. The
//! cursor is `<tag index>:<start offset>`; each batch is one page of one tag.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use serde::Deserialize;
use tracing::{debug, warn};

use mtcacg_config::model::CosineConfig;
use mtcacg_core::{
    AdapterType, Batch, Candidate, ContentItem, Cursor, Entry, HealthStatus, Identifier,
    MediaSource, MtcError, PluginAdapter, Quota, SourceAdapter,
};

use crate::http::{PIXIV_REFERER, build_client, check_reachable, get_json};

const NAME: &str = "cosine";
const COSINE_REFERER: &str = "https://pic.cosine.ren/";

#[derive(Debug, Deserialize)]
struct CosineImage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    rawurl: String,
    #[serde(default)]
    thumburl: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl CosineImage {
    /// `pixiv_<filename stem>`, e.g. `pixiv_133280809_p0`.
    fn identifier(&self) -> Option<Identifier> {
        let stem = match self.filename.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => self.filename.as_str(),
        };
        let stem = stem.trim();
        if stem.is_empty() {
            return None;
        }
        if stem.starts_with("pixiv_") {
            Some(Identifier(stem.to_string()))
        } else {
            Some(Identifier::new("pixiv", stem))
        }
    }

    fn into_item(self) -> Option<ContentItem> {
        let identifier = self.identifier()?;
        let url = if self.rawurl.is_empty() {
            self.thumburl
        } else {
            self.rawurl
        };
        if url.is_empty() {
            return None;
        }
        let referer = if url.contains("pximg.net") {
            PIXIV_REFERER
        } else {
            COSINE_REFERER
        };

        Some(
            ContentItem::new(
                identifier,
                NAME,
                MediaSource::Remote {
                    url,
                    referer: Some(referer.to_string()),
                },
            )
            .with_label("Title")
            .with_title(self.title.trim())
            .with_attribution(self.author)
            .with_tags(self.tags)
            .with_dimensions(self.width, self.height),
        )
    }
}

/// Decoded `<tag index>:<start offset>` cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    tag: usize,
    start: usize,
}

impl Position {
    fn parse(cursor: &Cursor) -> Self {
        cursor
            .position()
            .and_then(|p| p.split_once(':'))
            .and_then(|(tag, start)| {
                Some(Self {
                    tag: tag.parse().ok()?,
                    start: start.parse().ok()?,
                })
            })
            .unwrap_or(Self { tag: 0, start: 0 })
    }

    fn cursor(self) -> Cursor {
        Cursor::at(format!("{}:{}", self.tag, self.start))
    }
}

pub struct CosineSource {
    client: reqwest::Client,
    base_url: String,
    tags: Vec<String>,
    limit_per_tag: usize,
    page_size: usize,
}

impl CosineSource {
    pub fn new(config: &CosineConfig) -> Result<Self, MtcError> {
        Ok(Self {
            client: build_client(
                NAME,
                &[(REFERER, COSINE_REFERER.to_string())],
                Duration::from_secs(30),
            )?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tags: config.tags.clone(),
            limit_per_tag: config.limit_per_tag,
            page_size: config.page_size.max(1),
        })
    }

    fn next_tag(&self, at: Position) -> Option<Cursor> {
        let tag = at.tag + 1;
        (tag < self.tags.len()).then(|| Position { tag, start: 0 }.cursor())
    }

    async fn page(&self, tag: &str, start: usize) -> Result<Vec<CosineImage>, MtcError> {
        let request = self
            .client
            .get(format!("{}/api/tag", self.base_url))
            .query(&[("tag", tag)])
            .query(&[("start", start), ("limit", self.page_size)]);
        get_json(NAME, request).await
    }
}

#[async_trait]
impl PluginAdapter for CosineSource {
    fn name(&self) -> &str {
        NAME
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(check_reachable(&self.client, &self.base_url).await)
    }
}

#[async_trait]
impl SourceAdapter for CosineSource {
    async fn fetch_batch(&self, cursor: &Cursor) -> Result<Batch, MtcError> {
        let at = Position::parse(cursor);
        let Some(tag) = self.tags.get(at.tag) else {
            return Ok(Batch::empty());
        };

        let images = match self.page(tag, at.start).await {
            Ok(images) => images,
            Err(e) => {
                warn!(tag = tag.as_str(), start = at.start, error = %e, "tag page failed");
                return Ok(Batch::new(Vec::new(), self.next_tag(at)));
            }
        };
        if images.is_empty() {
            debug!(tag = tag.as_str(), "tag exhausted");
            return Ok(Batch::new(Vec::new(), self.next_tag(at)));
        }

        let candidates: Vec<Candidate> = images
            .into_iter()
            .filter_map(CosineImage::into_item)
            .map(|item| Candidate::Ready(Entry::Single(item)))
            .collect();
        debug!(
            tag = tag.as_str(),
            start = at.start,
            candidates = candidates.len(),
            "fetched tag page"
        );

        // Pages continue until the tag runs dry or `limit_per_tag` new
        // images of it have been delivered this cycle.
        let next = Position {
            tag: at.tag,
            start: at.start + self.page_size,
        };
        Ok(
            Batch::new(candidates, Some(next.cursor())).with_quota(Quota {
                group: format!("tag:{}", at.tag),
                limit: self.limit_per_tag,
                then: self.next_tag(at),
            }),
        )
    }
}
