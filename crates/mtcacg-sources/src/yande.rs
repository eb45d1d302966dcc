// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! yande.re (Moebooru) source.
//!
//! Each poll asks `post.json` for a handful of posts matching the configured
//! tags. Posts are expanded into their parent family so a set is delivered
//! together with `[i/N]` numbering.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mtcacg_config::model::YandeConfig;
use mtcacg_core::{
    AdapterType, Batch, Candidate, ContentFamily, ContentItem, Cursor, Entry, HealthStatus,
    Identifier, MediaSource, MtcError, PluginAdapter, SourceAdapter,
};

use crate::http::{build_client, check_reachable, get_json};

const NAME: &str = "yande";

/// Originals at or above this size are replaced by the sample rendition.
const MAX_ORIGINAL_BYTES: u64 = 15 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YandePost {
    pub id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub sample_url: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl YandePost {
    /// The original when it is small enough, else the sample.
    pub fn best_url(&self) -> Option<&str> {
        let original = self.file_url.as_deref().filter(|u| !u.is_empty());
        if self.file_size > 0 && self.file_size < MAX_ORIGINAL_BYTES {
            return original;
        }
        self.sample_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or(original)
    }

    fn in_family(&self) -> bool {
        self.parent_id.is_some() || self.has_children
    }

    fn item(&self) -> Option<ContentItem> {
        let url = self.best_url()?;
        Some(
            ContentItem::new(
                Identifier::new(NAME, self.id),
                NAME,
                MediaSource::Remote {
                    url: url.to_string(),
                    referer: None,
                },
            )
            .with_dimensions(self.width, self.height),
        )
    }
}

pub struct YandeSource {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
    tags: String,
    family_limit: usize,
}

impl YandeSource {
    pub fn new(config: &YandeConfig) -> Result<Self, MtcError> {
        Ok(Self {
            client: build_client(NAME, &[], Duration::from_secs(30))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
            tags: config.tags.clone(),
            family_limit: config.family_limit,
        })
    }

    async fn posts(&self, tags: &str, limit: Option<usize>) -> Result<Vec<YandePost>, MtcError> {
        let mut request = self
            .client
            .get(format!("{}/post.json", self.base_url))
            .query(&[("tags", tags)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        get_json(NAME, request).await
    }

    fn single(post: &YandePost) -> Option<Entry> {
        let item = post
            .item()?
            .with_label("Yande")
            .with_title(post.id.to_string())
            .with_tags(post.tags.split_whitespace().map(str::to_string).collect());
        Some(Entry::Single(item))
    }

    fn family(parent: u64, posts: &[YandePost]) -> Option<Entry> {
        let items: Vec<ContentItem> = posts
            .iter()
            .filter_map(|post| {
                Some(
                    post.item()?
                        .with_label("Yande Set")
                        .with_title(parent.to_string())
                        .with_tags(post.tags.split_whitespace().map(str::to_string).collect())
                        // Set captions carry a single tag.
                        .with_caption_tag_limit(1),
                )
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        Some(Entry::Family(ContentFamily::new(parent.to_string(), items)))
    }
}

#[async_trait]
impl PluginAdapter for YandeSource {
    fn name(&self) -> &str {
        NAME
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(check_reachable(&self.client, &format!("{}/post.json?limit=1", self.base_url)).await)
    }
}

#[async_trait]
impl SourceAdapter for YandeSource {
    async fn fetch_batch(&self, _cursor: &Cursor) -> Result<Batch, MtcError> {
        let posts = self.posts(&self.tags, Some(self.limit)).await?;

        let mut candidates = Vec::with_capacity(posts.len());
        for post in posts {
            let token = serde_json::to_string(&post)
                .map_err(|e| MtcError::Internal(format!("failed to encode yande post: {e}")))?;
            // A recorded post proves nothing about its siblings.
            let probe = (!post.in_family()).then(|| Identifier::new(NAME, post.id));
            candidates.push(Candidate::Deferred { probe, token });
        }
        Ok(Batch::last(candidates))
    }

    async fn expand(&self, token: &str) -> Result<Option<Entry>, MtcError> {
        let post: YandePost = serde_json::from_str(token).map_err(|e| MtcError::Malformed {
            source_name: NAME.into(),
            message: format!("bad expansion token: {e}"),
        })?;
        if !post.in_family() {
            return Ok(Self::single(&post));
        }

        let parent = post.parent_id.unwrap_or(post.id);
        let mut members = match self.posts(&format!("parent:{parent}"), None).await {
            Ok(members) => members,
            Err(e) => {
                warn!(parent, error = %e, "family lookup failed, sending post alone");
                Vec::new()
            }
        };
        members.truncate(self.family_limit);
        debug!(parent, members = members.len(), "expanded yande family");

        match members.len() {
            0 => Ok(Self::single(&post)),
            1 => Ok(Self::single(&members[0])),
            _ => Ok(Self::family(parent, &members)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> YandeSource {
        YandeSource::new(&YandeConfig {
            base_url: server.uri(),
            limit: 2,
            tags: "order:random".into(),
            ..YandeConfig::default()
        })
        .expect("source")
    }

    fn post(id: u64, parent: Option<u64>, tags: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "parent_id": parent,
            "has_children": parent.is_none() && tags.contains("set"),
            "file_url": format!("https://files.yande.re/{id}.png"),
            "sample_url": format!("https://files.yande.re/sample/{id}.jpg"),
            "file_size": 1024,
            "tags": tags,
            "width": 100,
            "height": 200,
        })
    }

    #[test]
    fn best_url_prefers_small_originals() {
        let mut p = YandePost {
            id: 1,
            parent_id: None,
            has_children: false,
            file_url: Some("orig".into()),
            sample_url: Some("sample".into()),
            file_size: 1024,
            tags: String::new(),
            width: 0,
            height: 0,
        };
        assert_eq!(p.best_url(), Some("orig"));
        p.file_size = 20 * 1024 * 1024;
        assert_eq!(p.best_url(), Some("sample"));
        p.file_size = 0;
        p.sample_url = None;
        assert_eq!(p.best_url(), Some("orig"));
    }

    #[tokio::test]
    async fn posts_become_deferred_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post.json"))
            .and(query_param("limit", "2"))
            .and(query_param("tags", "order:random"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([post(1, None, "sky"), post(2, Some(9), "cat")])),
            )
            .mount(&server)
            .await;

        let batch = source(&server).fetch_batch(&Cursor::start()).await.expect("batch");
        assert!(batch.next.is_none());
        assert_eq!(batch.candidates.len(), 2);
        assert_eq!(
            batch.candidates[0].probe().map(Identifier::as_str),
            Some("yande_1")
        );
        assert_eq!(batch.candidates[1].probe(), None);
    }

    #[tokio::test]
    async fn standalone_post_expands_to_single_item() {
        let server = MockServer::start().await;
        let yande = source(&server);
        let token = serde_json::to_string(&post(1, None, "sky blue")).expect("token");

        let entry = yande.expand(&token).await.expect("expand").expect("entry");
        let Entry::Single(item) = entry else {
            panic!("expected single");
        };
        assert_eq!(item.identifier.as_str(), "yande_1");
        assert_eq!(item.label, "Yande");
        assert_eq!(item.title, "1");
        assert_eq!(item.tags, vec!["sky", "blue"]);
        assert_eq!((item.width, item.height), (100, 200));
        assert_eq!(
            item.media,
            MediaSource::Remote {
                url: "https://files.yande.re/1.png".into(),
                referer: None,
            }
        );
    }

    #[tokio::test]
    async fn child_post_expands_to_parent_family() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post.json"))
            .and(query_param("tags", "parent:9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                post(9, None, "set first"),
                post(10, Some(9), "cat second"),
                post(11, Some(9), "dog third"),
            ])))
            .mount(&server)
            .await;

        let yande = source(&server);
        let token = serde_json::to_string(&post(10, Some(9), "cat")).expect("token");
        let entry = yande.expand(&token).await.expect("expand").expect("entry");
        let Entry::Family(family) = entry else {
            panic!("expected family");
        };
        assert_eq!(family.parent, "9");
        let ids: Vec<&str> = family.items.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(ids, vec!["yande_9", "yande_10", "yande_11"]);
        assert_eq!(family.items[1].label, "Yande Set");
        assert_eq!(family.items[1].title, "9");
        assert_eq!(family.items[1].tags, vec!["cat", "second"]);
        assert_eq!(family.items[1].caption_tags(), ["cat".to_string()]);
        assert_eq!(family.items[0].tags, vec!["set", "first"]);
    }

    #[tokio::test]
    async fn failed_family_lookup_falls_back_to_the_post() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let yande = source(&server);
        let token = serde_json::to_string(&post(10, Some(9), "cat")).expect("token");
        let entry = yande.expand(&token).await.expect("expand").expect("entry");
        assert!(matches!(entry, Entry::Single(item) if item.identifier.as_str() == "yande_10"));
    }

    #[tokio::test]
    async fn family_is_capped() {
        let server = MockServer::start().await;
        let members: Vec<_> = (0..15).map(|i| post(100 + i, Some(100), "x")).collect();
        Mock::given(method("GET"))
            .and(query_param("tags", "parent:100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Array(members)))
            .mount(&server)
            .await;

        let yande = source(&server);
        let token = serde_json::to_string(&post(101, Some(100), "x")).expect("token");
        let entry = yande.expand(&token).await.expect("expand").expect("entry");
        assert_eq!(entry.items().len(), 10);
        assert_eq!(entry.items()[9].position.map(|p| p.total), Some(10));
    }

    #[tokio::test]
    async fn upstream_error_fails_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source(&server).fetch_batch(&Cursor::start()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
