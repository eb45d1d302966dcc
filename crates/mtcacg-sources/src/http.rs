// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for source adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use mtcacg_core::{HealthStatus, MtcError};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// `Referer` expected by the Pixiv image CDN.
pub const PIXIV_REFERER: &str = "https://www.pixiv.net/";

/// Builds a client with a browser user agent plus `extra` default headers.
pub fn build_client(
    source: &str,
    extra: &[(HeaderName, String)],
    timeout: Duration,
) -> Result<reqwest::Client, MtcError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    for (name, value) in extra {
        let value = HeaderValue::from_str(value).map_err(|e| {
            MtcError::Config(format!("invalid {name} header value for {source}: {e}"))
        })?;
        headers.insert(name.clone(), value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| MtcError::Source {
            source_name: source.to_string(),
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Sends `request` and decodes a JSON body.
///
/// Transport failures and error statuses are [`MtcError::Source`]; an
/// undecodable body is [`MtcError::Malformed`].
pub async fn get_json<T: DeserializeOwned>(
    source: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, MtcError> {
    let response = request.send().await.map_err(|e| MtcError::Source {
        source_name: source.to_string(),
        message: format!("request failed: {e}"),
        source: Some(Box::new(e)),
    })?;

    let status = response.status();
    let url = response.url().to_string();
    if !status.is_success() {
        return Err(MtcError::source_error(
            source,
            format!("{url} returned {status}"),
        ));
    }

    let body = response.text().await.map_err(|e| MtcError::Source {
        source_name: source.to_string(),
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    debug!(source, url = url.as_str(), size = body.len(), "fetched index");

    serde_json::from_str(&body).map_err(|e| MtcError::Malformed {
        source_name: source.to_string(),
        message: format!("{url}: {e}"),
    })
}

/// Reports whether `url` answers with a success status.
pub async fn check_reachable(client: &reqwest::Client, url: &str) -> HealthStatus {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => HealthStatus::Healthy,
        Ok(response) => HealthStatus::Degraded(format!("{url} returned {}", response.status())),
        Err(e) => HealthStatus::Unhealthy(format!("{url} unreachable: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Probe {
        ok: bool,
    }

    fn client() -> reqwest::Client {
        build_client("test", &[], Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn decodes_json_with_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index"))
            .and(header("user-agent", BROWSER_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let probe: Probe = get_json("test", client().get(format!("{}/index", server.uri())))
            .await
            .expect("json");
        assert!(probe.ok);
    }

    #[tokio::test]
    async fn error_status_is_a_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = get_json::<Probe>("test", client().get(server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, MtcError::Source { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn bad_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = get_json::<Probe>("test", client().get(server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, MtcError::Malformed { .. }));
    }

    #[test]
    fn invalid_header_value_is_a_config_error() {
        let err = build_client(
            "pixiv",
            &[(reqwest::header::COOKIE, "bad\nvalue".into())],
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, MtcError::Config(_)));
    }
}
