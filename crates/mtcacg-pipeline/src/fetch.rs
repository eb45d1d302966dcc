// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP media downloads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::debug;

use mtcacg_core::{AdapterType, HealthStatus, MediaFetcher, MtcError, PluginAdapter};

/// Desktop browser user agent; several galleries reject obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Downloads media over HTTP with an optional `Referer`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, MtcError> {
        Self::with_timeout(Duration::from_secs(60))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, MtcError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MtcError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PluginAdapter for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fetcher
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, MtcError> {
        let download_err = |message: String, source: Option<reqwest::Error>| MtcError::Download {
            url: url.to_string(),
            message,
            source: source.map(|e| Box::new(e) as _),
        };

        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            let value = HeaderValue::from_str(referer)
                .map_err(|e| download_err(format!("invalid referer: {e}"), None))?;
            request = request.header(REFERER, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| download_err(format!("request failed: {e}"), Some(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("unexpected status {status}"), None));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_err(format!("failed to read body: {e}"), Some(e)))?;
        debug!(url, size = bytes.len(), "downloaded media");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn downloads_body_with_referer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/1.png"))
            .and(header("referer", "https://www.pixiv.net/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().expect("client");
        let bytes = fetcher
            .fetch(
                &format!("{}/img/1.png", server.uri()),
                Some("https://www.pixiv.net/"),
            )
            .await
            .expect("fetch");
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn error_status_is_a_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().expect("client");
        let err = fetcher
            .fetch(&format!("{}/blocked.jpg", server.uri()), None)
            .await
            .unwrap_err();
        match err {
            MtcError::Download { url, message, .. } => {
                assert!(url.ends_with("/blocked.jpg"));
                assert!(message.contains("403"));
            }
            other => panic!("expected download error, got {other:?}"),
        }
    }
}
