// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pixiv artist source using a logged-in web session cookie.
//!
//! The cursor walks the configured artists one per batch. Each artist yields
//! their newest works as deferred candidates; expansion resolves the work's
//! metadata and page list into a family of `pixiv_<id>_p<n>` items.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER};
use serde::Deserialize;
use tracing::{debug, info, warn};

use mtcacg_config::model::PixivConfig;
use mtcacg_core::{
    AdapterType, Batch, Candidate, ContentFamily, ContentItem, Cursor, Entry, HealthStatus,
    Identifier, MediaSource, MtcError, PluginAdapter, SourceAdapter,
};

use crate::http::{PIXIV_REFERER, build_client, check_reachable, get_json};

const NAME: &str = "pixiv";

/// `illustType` of animated works, which cannot be sent as a photo.
const UGOIRA: u8 = 2;

/// Envelope shared by the `/ajax` endpoints.
#[derive(Debug, Deserialize)]
struct Ajax<T> {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
    body: Option<T>,
}

impl<T> Ajax<T> {
    fn into_body(self, what: &str) -> Result<T, MtcError> {
        match self.body {
            Some(body) if !self.error => Ok(body),
            _ => Err(MtcError::source_error(
                NAME,
                format!("{what} rejected: {}", self.message),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Profile {
    /// Keyed by work id; values are always null.
    #[serde(default)]
    illusts: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Illust {
    #[serde(default)]
    illust_title: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    illust_type: u8,
    #[serde(default)]
    tags: IllustTags,
}

#[derive(Debug, Default, Deserialize)]
struct IllustTags {
    #[serde(default)]
    tags: Vec<IllustTag>,
}

#[derive(Debug, Deserialize)]
struct IllustTag {
    tag: String,
}

#[derive(Debug, Deserialize)]
struct Page {
    urls: PageUrls,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct PageUrls {
    original: String,
}

pub struct PixivSource {
    client: reqwest::Client,
    base_url: String,
    artist_ids: Vec<String>,
    limit: usize,
    max_pages: usize,
    /// Works known to be animations, skipped on later cycles.
    ugoira: Mutex<HashSet<String>>,
}

impl PixivSource {
    /// Fails with [`MtcError::Config`] when no session cookie is configured.
    pub fn new(config: &PixivConfig) -> Result<Self, MtcError> {
        let phpsessid = config
            .phpsessid
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MtcError::Config("sources.pixiv.phpsessid is required".into()))?;

        let client = build_client(
            NAME,
            &[
                (COOKIE, format!("PHPSESSID={phpsessid}")),
                (REFERER, PIXIV_REFERER.to_string()),
            ],
            Duration::from_secs(30),
        )?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            artist_ids: config.artist_ids.clone(),
            limit: config.limit,
            max_pages: config.max_pages,
            ugoira: Mutex::new(HashSet::new()),
        })
    }

    fn is_ugoira(&self, id: &str) -> bool {
        self.ugoira.lock().is_ok_and(|known| known.contains(id))
    }

    fn remember_ugoira(&self, id: &str) {
        if let Ok(mut known) = self.ugoira.lock() {
            known.insert(id.to_string());
        }
    }

    /// Newest work ids of `artist`, highest id first.
    async fn newest_works(&self, artist: &str) -> Result<Vec<String>, MtcError> {
        let url = format!("{}/ajax/user/{artist}/profile/all", self.base_url);
        let profile: Ajax<Profile> = get_json(NAME, self.client.get(url)).await?;
        let profile = profile.into_body("profile")?;

        let mut ids: Vec<(u64, String)> = profile
            .illusts
            .into_keys()
            .filter_map(|id| id.parse::<u64>().ok().map(|n| (n, id)))
            .collect();
        ids.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        ids.truncate(self.limit);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}

#[async_trait]
impl PluginAdapter for PixivSource {
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
impl SourceAdapter for PixivSource {
    async fn fetch_batch(&self, cursor: &Cursor) -> Result<Batch, MtcError> {
        let index: usize = cursor
            .position()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        let Some(artist) = self.artist_ids.get(index) else {
            return Ok(Batch::empty());
        };
        let next = (index + 1 < self.artist_ids.len()).then(|| Cursor::at((index + 1).to_string()));

        // One artist failing must not starve the rest of the list.
        let works = match self.newest_works(artist).await {
            Ok(works) => works,
            Err(e) => {
                warn!(artist = artist.as_str(), error = %e, "artist lookup failed");
                return Ok(Batch::new(Vec::new(), next));
            }
        };

        let candidates = works
            .into_iter()
            .filter(|id| !self.is_ugoira(id))
            .map(|id| Candidate::Deferred {
                probe: None,
                token: id,
            })
            .collect::<Vec<_>>();
        debug!(artist = artist.as_str(), works = candidates.len(), "listed artist works");

        Ok(Batch::new(candidates, next))
    }

    async fn expand(&self, token: &str) -> Result<Option<Entry>, MtcError> {
        let illust: Ajax<Illust> = get_json(
            NAME,
            self.client.get(format!("{}/ajax/illust/{token}", self.base_url)),
        )
        .await?;
        let illust = illust.into_body("illust")?;

        if illust.illust_type == UGOIRA {
            info!(work = token, "skipping animated work");
            self.remember_ugoira(token);
            return Ok(None);
        }

        let pages: Ajax<Vec<Page>> = get_json(
            NAME,
            self.client
                .get(format!("{}/ajax/illust/{token}/pages", self.base_url)),
        )
        .await?;
        let mut pages = pages.into_body("pages")?;
        if pages.is_empty() {
            warn!(work = token, "work has no pages");
            return Ok(None);
        }
        pages.truncate(self.max_pages);

        let tags: Vec<String> = illust.tags.tags.into_iter().map(|t| t.tag).collect();
        let items = pages
            .into_iter()
            .enumerate()
            .map(|(i, page)| {
                ContentItem::new(
                    Identifier::page(NAME, token, i),
                    NAME,
                    MediaSource::Remote {
                        url: page.urls.original,
                        referer: Some(PIXIV_REFERER.to_string()),
                    },
                )
                .with_label("Pixiv")
                .with_title(illust.illust_title.clone())
                .with_attribution(illust.user_name.clone())
                .with_tags(tags.clone())
                .with_dimensions(page.width, page.height)
            })
            .collect();

        Ok(Some(Entry::Family(ContentFamily::new(token, items))))
    }
}
