// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock source adapter with a scripted sequence of fetch results.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mtcacg_core::{
    AdapterType, Batch, Cursor, Entry, HealthStatus, MtcError, PluginAdapter, SourceAdapter,
};

/// One scripted answer to `fetch_batch`.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Batch(Batch),
    /// Fails with a transient source error carrying this message.
    Fail(String),
}

/// A source whose batches are popped from a FIFO script.
///
/// Once the script is exhausted every call returns an empty batch.
pub struct MockSource {
    name: String,
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    expansions: Arc<Mutex<HashMap<String, Entry>>>,
    cursors: Arc<Mutex<Vec<Cursor>>>,
    expanded: Arc<Mutex<Vec<String>>>,
}

impl MockSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            expansions: Arc::new(Mutex::new(HashMap::new())),
            cursors: Arc::new(Mutex::new(Vec::new())),
            expanded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock source pre-loaded with the given script.
    pub fn with_script(name: &str, steps: Vec<ScriptStep>) -> Self {
        let source = Self::new(name);
        if let Ok(mut script) = source.script.try_lock() {
            script.extend(steps);
        }
        source
    }

    pub async fn push(&self, step: ScriptStep) {
        self.script.lock().await.push_back(step);
    }

    /// Registers the entry returned by `expand(token)`.
    pub async fn add_expansion(&self, token: &str, entry: Entry) {
        self.expansions.lock().await.insert(token.to_string(), entry);
    }

    /// Cursors passed to `fetch_batch`, in call order.
    pub async fn cursors_seen(&self) -> Vec<Cursor> {
        self.cursors.lock().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.cursors.lock().await.len()
    }

    /// Tokens passed to `expand`, in call order.
    pub async fn expanded_tokens(&self) -> Vec<String> {
        self.expanded.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> Result<HealthStatus, MtcError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    async fn fetch_batch(&self, cursor: &Cursor) -> Result<Batch, MtcError> {
        self.cursors.lock().await.push(cursor.clone());
        match self.script.lock().await.pop_front() {
            Some(ScriptStep::Batch(batch)) => Ok(batch),
            Some(ScriptStep::Fail(message)) => Err(MtcError::source_error(&self.name, message)),
            None => Ok(Batch::empty()),
        }
    }

    async fn expand(&self, token: &str) -> Result<Option<Entry>, MtcError> {
        self.expanded.lock().await.push(token.to_string());
        Ok(self.expansions.lock().await.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_is_replayed_then_exhausted() {
        let source = MockSource::with_script(
            "mock",
            vec![ScriptStep::Fail("boom".into()), ScriptStep::Batch(Batch::empty())],
        );

        assert!(source.fetch_batch(&Cursor::start()).await.is_err());
        assert!(source.fetch_batch(&Cursor::start()).await.unwrap().is_empty());
        assert!(source.fetch_batch(&Cursor::at("x")).await.unwrap().is_empty());
        assert_eq!(source.fetch_count().await, 3);
        assert_eq!(source.cursors_seen().await[2], Cursor::at("x"));
    }

    #[tokio::test]
    async fn unknown_token_expands_to_nothing() {
        let source = MockSource::new("mock");
        assert!(source.expand("missing").await.unwrap().is_none());
        assert_eq!(source.expanded_tokens().await, vec!["missing"]);
    }
}
