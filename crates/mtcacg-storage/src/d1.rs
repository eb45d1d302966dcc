// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloudflare D1 implementation of the `LedgerStore` trait.
//!
//! Talks to the D1 HTTP query endpoint:
//! `POST {endpoint}/accounts/{account}/d1/database/{db}/query` with a bearer
//! token and a `{ "sql", "params" }` body.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use mtcacg_config::model::D1Config;
use mtcacg_core::{
    AdapterType, HealthStatus, HistoryEntry, Identifier, LedgerStore, MtcError, PluginAdapter,
};

const SELECT_IDS: &str = "SELECT id FROM images";
const INSERT_OR_IGNORE: &str = "INSERT OR IGNORE INTO images (id, file_name, caption, tags, created_at, width, height) VALUES (?, ?, ?, ?, ?, ?, ?)";

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Vec<QueryResult>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    meta: Option<QueryMeta>,
}

#[derive(Debug, Deserialize)]
struct QueryMeta {
    #[serde(default)]
    changes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// Ledger rows stored in a Cloudflare D1 database.
#[derive(Debug, Clone)]
pub struct D1LedgerStore {
    client: reqwest::Client,
    query_url: String,
    api_token: String,
}

impl D1LedgerStore {
    pub fn new(
        endpoint: &str,
        account_id: &str,
        database_id: &str,
        api_token: &str,
    ) -> Result<Self, MtcError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MtcError::storage("failed to build D1 HTTP client", e))?;

        Ok(Self {
            client,
            query_url: format!(
                "{}/accounts/{account_id}/d1/database/{database_id}/query",
                endpoint.trim_end_matches('/')
            ),
            api_token: api_token.to_string(),
        })
    }

    pub fn from_config(config: &D1Config) -> Result<Self, MtcError> {
        let require = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MtcError::Config(format!("ledger.d1.{key} is not set")))
        };
        let account_id = require(&config.account_id, "account_id")?;
        let database_id = require(&config.database_id, "database_id")?;
        let api_token = require(&config.api_token, "api_token")?;
        Self::new(&config.endpoint, &account_id, &database_id, &api_token)
    }

    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<QueryResponse, MtcError> {
        let response = self
            .client
            .post(&self.query_url)
            .bearer_auth(&self.api_token)
            .json(&QueryRequest { sql, params })
            .send()
            .await
            .map_err(|e| MtcError::storage("D1 request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MtcError::storage("failed to read D1 response", e))?;

        if !status.is_success() {
            return Err(MtcError::Storage {
                message: format!("D1 returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| MtcError::storage("failed to parse D1 response", e))?;

        if !parsed.success {
            let reasons: Vec<&str> = parsed.errors.iter().map(|m| m.message.as_str()).collect();
            return Err(MtcError::Storage {
                message: format!("D1 query unsuccessful: {}", reasons.join("; ")),
                source: None,
            });
        }

        Ok(parsed)
    }
}

#[async_trait]
impl PluginAdapter for D1LedgerStore {
    fn name(&self) -> &str {
        "d1"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        match self.query("SELECT 1", Vec::new()).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl LedgerStore for D1LedgerStore {
    async fn load_identifiers(&self) -> Result<Vec<Identifier>, MtcError> {
        let response = self.query(SELECT_IDS, Vec::new()).await?;
        let first = response.result.into_iter().next().ok_or_else(|| MtcError::Storage {
            message: "D1 returned no result set".into(),
            source: None,
        })?;

        let ids: Vec<Identifier> = first
            .results
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str))
            .filter(|id| !id.is_empty())
            .map(Identifier::from)
            .collect();
        debug!(count = ids.len(), "loaded ledger identifiers from d1");
        Ok(ids)
    }

    async fn insert_or_ignore(&self, entry: &HistoryEntry) -> Result<bool, MtcError> {
        let params = vec![
            Value::from(entry.identifier.as_str()),
            Value::from(entry.file_reference.0.as_str()),
            Value::from(entry.caption.as_str()),
            Value::from(entry.tags.as_str()),
            Value::from(entry.created_at),
            Value::from(entry.width),
            Value::from(entry.height),
        ];
        let response = self.query(INSERT_OR_IGNORE, params).await?;

        // Older API responses omit `meta`; treat those as a write.
        let changes = response
            .result
            .first()
            .and_then(|r| r.meta.as_ref())
            .and_then(|m| m.changes);
        Ok(changes.is_none_or(|c| c > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtcacg_core::FileReference;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUERY_PATH: &str = "/accounts/acct/d1/database/db/query";

    fn store(server: &MockServer) -> D1LedgerStore {
        D1LedgerStore::new(&server.uri(), "acct", "db", "secret").unwrap()
    }

    fn entry() -> HistoryEntry {
        HistoryEntry {
            identifier: Identifier::from("yande_7"),
            file_reference: FileReference("AgAD".into()),
            caption: "Yande: 7".into(),
            tags: "tag yande".into(),
            created_at: 1_700_000_000,
            width: 10,
            height: 20,
        }
    }

    #[tokio::test]
    async fn load_identifiers_parses_first_result_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({ "sql": "SELECT id FROM images" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": [{ "results": [{ "id": "yande_1" }, { "id": "" }, { "id": "pixiv_2_p0" }] }]
            })))
            .mount(&server)
            .await;

        let ids = store(&server).load_identifiers().await.unwrap();
        assert_eq!(
            ids,
            vec![Identifier::from("yande_1"), Identifier::from("pixiv_2_p0")]
        );
    }

    #[tokio::test]
    async fn unsuccessful_response_is_a_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "result": [],
                "errors": [{ "code": 7500, "message": "no such table: images" }]
            })))
            .mount(&server)
            .await;

        let err = store(&server).load_identifiers().await.unwrap_err();
        assert!(matches!(&err, MtcError::Storage { message, .. } if message.contains("no such table")));
    }

    #[tokio::test]
    async fn http_error_status_is_a_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = store(&server).insert_or_ignore(&entry()).await.unwrap_err();
        assert!(matches!(&err, MtcError::Storage { message, .. } if message.contains("403")));
    }

    #[tokio::test]
    async fn insert_sends_parameters_and_reads_changes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .and(body_partial_json(serde_json::json!({
                "params": ["yande_7", "AgAD", "Yande: 7", "tag yande", 1_700_000_000, 10, 20]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": [{ "results": [], "meta": { "changes": 0 } }]
            })))
            .mount(&server)
            .await;

        assert!(!store(&server).insert_or_ignore(&entry()).await.unwrap());
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = D1Config {
            account_id: Some("acct".into()),
            api_token: None,
            database_id: Some("db".into()),
            endpoint: "https://api.cloudflare.com/client/v4".into(),
        };
        assert!(matches!(
            D1LedgerStore::from_config(&config),
            Err(MtcError::Config(_))
        ));
    }
}
