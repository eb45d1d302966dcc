// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media fetcher serving canned bytes per URL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mtcacg_core::{AdapterType, HealthStatus, MediaFetcher, MtcError, PluginAdapter};

/// Returns registered bytes for known URLs and a download error otherwise.
#[derive(Default)]
pub struct MockFetcher {
    bodies: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, url: &str, bytes: Vec<u8>) {
        self.bodies.lock().await.insert(url.to_string(), bytes);
    }

    /// `(url, referer)` pairs in request order.
    pub async fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockFetcher {
    fn name(&self) -> &str {
        "mock-fetcher"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fetcher
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, MtcError> {
        self.requests
            .lock()
            .await
            .push((url.to_string(), referer.map(str::to_string)));
        self.bodies
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| MtcError::Download {
                url: url.to_string(),
                message: "404 Not Found".into(),
                source: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_bytes_and_records_referer() {
        let fetcher = MockFetcher::new();
        fetcher.add("https://img.test/a.jpg", vec![9; 4]).await;

        let bytes = fetcher
            .fetch("https://img.test/a.jpg", Some("https://www.pixiv.net/"))
            .await
            .unwrap();
        assert_eq!(bytes.len(), 4);
        assert!(fetcher.fetch("https://img.test/missing.jpg", None).await.is_err());

        let requests = fetcher.requests().await;
        assert_eq!(requests[0].1.as_deref(), Some("https://www.pixiv.net/"));
    }
}
