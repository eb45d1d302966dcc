// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mtcacg doctor` command implementation.
//!
//! Health-checks the ledger store, the Telegram bot and every enabled
//! source, then prints one line per check.

use std::time::{Duration, Instant};

use mtcacg_config::MtcConfig;
use mtcacg_core::{HealthStatus, MtcError, PluginAdapter};
use mtcacg_sources::build_sources;
use mtcacg_storage::open_store;
use mtcacg_telegram::{TelegramTarget, bot_from_config};

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn from_health(
        name: impl Into<String>,
        health: Result<HealthStatus, MtcError>,
        start: Instant,
    ) -> Self {
        let (status, message) = match health {
            Ok(HealthStatus::Healthy) => (CheckStatus::Pass, "healthy".to_string()),
            Ok(HealthStatus::Degraded(reason)) => (CheckStatus::Warn, reason),
            Ok(HealthStatus::Unhealthy(reason)) => (CheckStatus::Fail, reason),
            Err(e) => (CheckStatus::Fail, e.to_string()),
        };
        Self {
            name: name.into(),
            status,
            message,
            duration: start.elapsed(),
        }
    }

    fn failed(name: impl Into<String>, error: MtcError, start: Instant) -> Self {
        Self::from_health(name, Err(error), start)
    }

    fn line(&self) -> String {
        let tag = match self.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({}ms)",
            self.name,
            self.message,
            self.duration.as_millis()
        )
    }
}

/// Runs the `mtcacg doctor` command and returns the number of failed checks.
pub async fn run_doctor(config: &MtcConfig) -> usize {
    let mut results = vec![CheckResult {
        name: "Configuration".to_string(),
        status: CheckStatus::Pass,
        message: "valid".to_string(),
        duration: Duration::ZERO,
    }];
    results.push(check_ledger(config).await);
    results.push(check_telegram(config).await);
    results.extend(check_sources(config).await);

    println!();
    println!("  mtcacg doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", result.line());
    }
    println!();

    let failures = count(&results, CheckStatus::Fail);
    let issues = failures + count(&results, CheckStatus::Warn);
    if issues > 0 {
        let word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    failures
}

fn count(results: &[CheckResult], status: CheckStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

/// Opens the store and loads every identifier.
async fn check_ledger(config: &MtcConfig) -> CheckResult {
    let start = Instant::now();
    let name = format!("Ledger ({:?})", config.ledger.backend);
    let store = match open_store(&config.ledger).await {
        Ok(store) => store,
        Err(e) => return CheckResult::failed(name, e, start),
    };
    match store.load_identifiers().await {
        Ok(ids) => CheckResult {
            name,
            status: CheckStatus::Pass,
            message: format!("{} delivered identifiers", ids.len()),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult::failed(name, e, start),
    }
}

async fn check_telegram(config: &MtcConfig) -> CheckResult {
    let start = Instant::now();
    if config.telegram.bot_token.is_none() {
        return CheckResult {
            name: "Telegram".to_string(),
            status: CheckStatus::Warn,
            message: "telegram.bot_token not set".to_string(),
            duration: start.elapsed(),
        };
    }
    let target = match bot_from_config(&config.telegram)
        .and_then(|bot| TelegramTarget::new(bot, &config.telegram))
    {
        Ok(target) => target,
        Err(e) => return CheckResult::failed("Telegram", e, start),
    };
    CheckResult::from_health("Telegram", target.health_check().await, start)
}

async fn check_sources(config: &MtcConfig) -> Vec<CheckResult> {
    let start = Instant::now();
    let sources = match build_sources(&config.sources) {
        Ok(sources) => sources,
        Err(e) => return vec![CheckResult::failed("Sources", e, start)],
    };
    if sources.is_empty() {
        return vec![CheckResult {
            name: "Sources".to_string(),
            status: CheckStatus::Warn,
            message: "no source enabled".to_string(),
            duration: start.elapsed(),
        }];
    }

    let mut results = Vec::with_capacity(sources.len());
    for source in sources {
        let start = Instant::now();
        let name = format!("Source {}", source.adapter.name());
        results.push(CheckResult::from_health(
            name,
            source.adapter.health_check().await,
            start,
        ));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_maps_to_status() {
        let start = Instant::now();
        let ok = CheckResult::from_health("a", Ok(HealthStatus::Healthy), start);
        assert_eq!(ok.status, CheckStatus::Pass);

        let degraded =
            CheckResult::from_health("b", Ok(HealthStatus::Degraded("slow".into())), start);
        assert_eq!(degraded.status, CheckStatus::Warn);
        assert_eq!(degraded.message, "slow");

        let err = CheckResult::failed("c", MtcError::Config("missing".into()), start);
        assert_eq!(err.status, CheckStatus::Fail);
        assert!(err.message.contains("missing"));
        assert!(err.line().contains("[FAIL]"));
    }

    #[tokio::test]
    async fn sqlite_ledger_and_missing_bot_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = MtcConfig::default();
        config.ledger.database_path = dir.path().join("ledger.db").display().to_string();

        let ledger = check_ledger(&config).await;
        assert_eq!(ledger.status, CheckStatus::Pass, "{}", ledger.message);
        assert_eq!(ledger.message, "0 delivered identifiers");

        let telegram = check_telegram(&config).await;
        assert_eq!(telegram.status, CheckStatus::Warn);

        let sources = check_sources(&config).await;
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].status, CheckStatus::Warn);
    }
}
