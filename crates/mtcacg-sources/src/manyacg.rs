// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ManyACG random artwork source.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use mtcacg_config::model::ManyAcgConfig;
use mtcacg_core::{
    AdapterType, Batch, Candidate, ContentItem, Cursor, Entry, HealthStatus, Identifier,
    MediaSource, MtcError, PluginAdapter, SourceAdapter,
};

use crate::http::{build_client, check_reachable, get_json};

const NAME: &str = "manyacg";

#[derive(Debug, Deserialize)]
struct RandomResponse {
    #[serde(default)]
    data: Vec<Artwork>,
}

/// The API has served ids both as numbers and as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtworkId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ArtworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtworkId::Number(n) => write!(f, "{n}"),
            ArtworkId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Artwork {
    id: ArtworkId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: Option<Artist>,
    #[serde(default)]
    pictures: Vec<Picture>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    r18: bool,
}

#[derive(Debug, Deserialize)]
struct Artist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Picture {
    #[serde(default)]
    regular: String,
}

impl Artwork {
    fn into_item(self) -> Option<ContentItem> {
        let url = self
            .pictures
            .into_iter()
            .map(|p| p.regular)
            .find(|u| !u.is_empty())?;

        let mut tags = self.tags;
        if self.r18 {
            tags.push("R-18".to_string());
        }

        Some(
            ContentItem::new(
                Identifier::new(NAME, &self.id),
                NAME,
                MediaSource::Remote { url, referer: None },
            )
            .with_label("MtcACG")
            .with_title(self.title)
            .with_attribution(self.artist.map(|a| a.name).unwrap_or_default())
            .with_tags(tags),
        )
    }
}

pub struct ManyAcgSource {
    client: reqwest::Client,
    base_url: String,
}

impl ManyAcgSource {
    pub fn new(config: &ManyAcgConfig) -> Result<Self, MtcError> {
        Ok(Self {
            client: build_client(NAME, &[], Duration::from_secs(60))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn random_url(&self) -> String {
        format!("{}/api/v1/artwork/random", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for ManyAcgSource {
    fn name(&self) -> &str {
        NAME
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(check_reachable(&self.client, &self.random_url()).await)
    }
}

#[async_trait]
impl SourceAdapter for ManyAcgSource {
    async fn fetch_batch(&self, _cursor: &Cursor) -> Result<Batch, MtcError> {
        let response: RandomResponse = get_json(NAME, self.client.get(self.random_url())).await?;
        let candidates = response
            .data
            .into_iter()
            .filter_map(Artwork::into_item)
            .map(|item| Candidate::Ready(Entry::Single(item)))
            .collect();
        Ok(Batch::last(candidates))
    }
}
