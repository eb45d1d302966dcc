// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates constraints that cannot be expressed via serde attributes, such
//! as required credentials for enabled sources and the normalizer quality range.

use crate::diagnostic::ConfigError;
use crate::model::{LedgerBackend, MtcConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MtcConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.daemon.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "daemon.log_level `{}` must be one of {}",
            config.daemon.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    validate_telegram(config, &mut errors);
    validate_ledger(config, &mut errors);
    validate_normalizer(config, &mut errors);
    validate_sources(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_telegram(config: &MtcConfig, errors: &mut Vec<ConfigError>) {
    let telegram = &config.telegram;
    let bot_runs = telegram.bot_token.is_some();

    if let Some(token) = &telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::validation("telegram.bot_token must not be empty"));
    }

    if (bot_runs || config.any_source_enabled()) && telegram.channel_id.is_none() {
        errors.push(ConfigError::validation(
            "telegram.channel_id is required when the bot or any source is enabled",
        ));
    }

    if config.any_source_enabled() && !bot_runs {
        errors.push(ConfigError::validation(
            "telegram.bot_token is required when any source is enabled",
        ));
    }

    if telegram.max_photo_bytes == 0 {
        errors.push(ConfigError::validation(
            "telegram.max_photo_bytes must be greater than 0",
        ));
    }

    if telegram.caption_limit == 0 {
        errors.push(ConfigError::validation(
            "telegram.caption_limit must be greater than 0",
        ));
    }
}

fn validate_ledger(config: &MtcConfig, errors: &mut Vec<ConfigError>) {
    let ledger = &config.ledger;
    match ledger.backend {
        LedgerBackend::Sqlite => {
            if ledger.database_path.trim().is_empty() {
                errors.push(ConfigError::validation(
                    "ledger.database_path must not be empty",
                ));
            }
        }
        LedgerBackend::D1 => {
            let d1 = &ledger.d1;
            for (name, value) in [
                ("account_id", &d1.account_id),
                ("api_token", &d1.api_token),
                ("database_id", &d1.database_id),
            ] {
                if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                    errors.push(ConfigError::validation(format!(
                        "ledger.d1.{name} is required when ledger.backend = \"d1\""
                    )));
                }
            }
            if d1.endpoint.trim().is_empty() {
                errors.push(ConfigError::validation(
                    "ledger.d1.endpoint must not be empty",
                ));
            }
        }
    }
}

fn validate_normalizer(config: &MtcConfig, errors: &mut Vec<ConfigError>) {
    let n = &config.normalizer;
    if n.min_quality == 0 || n.min_quality > n.start_quality || n.start_quality > 100 {
        errors.push(ConfigError::validation(format!(
            "normalizer qualities must satisfy 0 < min_quality <= start_quality <= 100, got min {} start {}",
            n.min_quality, n.start_quality
        )));
    }
    if n.quality_step == 0 {
        errors.push(ConfigError::validation(
            "normalizer.quality_step must be greater than 0",
        ));
    }
}

fn validate_sources(config: &MtcConfig, errors: &mut Vec<ConfigError>) {
    let sources = &config.sources;

    if sources.yande.enabled && sources.yande.limit == 0 {
        errors.push(ConfigError::validation(
            "sources.yande.limit must be greater than 0",
        ));
    }

    let pixiv = &sources.pixiv;
    if pixiv.enabled {
        if pixiv.phpsessid.as_deref().is_none_or(|v| v.trim().is_empty()) {
            errors.push(ConfigError::validation(
                "sources.pixiv.phpsessid is required when the pixiv source is enabled",
            ));
        }
        if pixiv.artist_ids.iter().all(|id| id.trim().is_empty()) {
            errors.push(ConfigError::validation(
                "sources.pixiv.artist_ids must list at least one artist",
            ));
        }
        for id in &pixiv.artist_ids {
            if !id.trim().chars().all(|c| c.is_ascii_digit()) {
                errors.push(ConfigError::validation(format!(
                    "sources.pixiv.artist_ids entry `{id}` is not a numeric id"
                )));
            }
        }
    }

    let cosine = &sources.cosine;
    if cosine.enabled {
        if cosine.tags.iter().all(|t| t.trim().is_empty()) {
            errors.push(ConfigError::validation(
                "sources.cosine.tags must list at least one tag",
            ));
        }
        if cosine.page_size == 0 {
            errors.push(ConfigError::validation(
                "sources.cosine.page_size must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &MtcConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&MtcConfig::default()).is_ok());
    }

    #[test]
    fn enabled_source_requires_channel_and_token() {
        let mut config = MtcConfig::default();
        config.sources.manyacg.enabled = true;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("channel_id")));
        assert!(msgs.iter().any(|m| m.contains("bot_token")));
    }

    #[test]
    fn quality_triple_is_checked() {
        let mut config = MtcConfig::default();
        config.normalizer.min_quality = 99;
        config.normalizer.quality_step = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn d1_backend_requires_all_credentials() {
        let mut config = MtcConfig::default();
        config.ledger.backend = LedgerBackend::D1;
        config.ledger.d1.account_id = Some("acct".into());
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("ledger.d1.api_token")));
        assert!(msgs.iter().any(|m| m.contains("ledger.d1.database_id")));
        assert!(!msgs.iter().any(|m| m.contains("ledger.d1.account_id")));
    }

    #[test]
    fn enabled_pixiv_requires_cookie_and_artists() {
        let mut config = MtcConfig::default();
        config.telegram.bot_token = Some("1:A".into());
        config.telegram.channel_id = Some(-100);
        config.sources.pixiv.enabled = true;
        config.sources.pixiv.artist_ids = vec!["abc".into()];
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("phpsessid")));
        assert!(msgs.iter().any(|m| m.contains("`abc`")));
    }

    #[test]
    fn enabled_cosine_requires_tags() {
        let mut config = MtcConfig::default();
        config.telegram.bot_token = Some("1:A".into());
        config.telegram.channel_id = Some(-100);
        config.sources.cosine.enabled = true;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("sources.cosine.tags"));
    }

    #[test]
    fn complete_config_passes() {
        let mut config = MtcConfig::default();
        config.telegram.bot_token = Some("1:A".into());
        config.telegram.channel_id = Some(-100);
        config.sources.yande.enabled = true;
        config.sources.pixiv.enabled = true;
        config.sources.pixiv.phpsessid = Some("sess".into());
        config.sources.pixiv.artist_ids = vec!["12345".into()];
        assert!(validate_config(&config).is_ok());
    }
}
