// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the MtcACG configuration system.

use mtcacg_config::diagnostic::ConfigError;
use mtcacg_config::model::{LedgerBackend, MtcConfig};
use mtcacg_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[daemon]
log_level = "debug"

[telegram]
bot_token = "123:ABC"
channel_id = -1001234
allowed_users = ["alice", "42"]
default_caption = "Caption"

[ledger]
backend = "d1"

[ledger.d1]
account_id = "acct"
api_token = "tok"
database_id = "db"

[normalizer]
start_quality = 90
quality_step = 10
min_quality = 50

[sources.yande]
enabled = true
tags = "rating:safe"
limit = 5

[sources.pixiv]
enabled = true
phpsessid = "sess"
artist_ids = ["111", "222"]

[sources.cosine]
enabled = true
tags = ["tag-a"]
cycle_delay_secs = 60
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.daemon.log_level, "debug");
    assert_eq!(config.telegram.channel_id, Some(-1001234));
    assert_eq!(config.telegram.allowed_users, vec!["alice", "42"]);
    assert_eq!(config.telegram.default_caption, "Caption");
    assert_eq!(config.ledger.backend, LedgerBackend::D1);
    assert_eq!(config.ledger.d1.database_id.as_deref(), Some("db"));
    assert_eq!(config.normalizer.start_quality, 90);
    assert_eq!(config.sources.yande.tags, "rating:safe");
    assert_eq!(config.sources.yande.limit, 5);
    assert_eq!(config.sources.pixiv.artist_ids, vec!["111", "222"]);
    assert_eq!(config.sources.cosine.cycle_delay_secs, 60);
    assert!(!config.sources.manyacg.enabled);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.daemon.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.telegram.allowed_users.is_empty());
    assert_eq!(config.telegram.default_caption, "MtcACG:TG");
    assert_eq!(config.telegram.max_photo_bytes, 9 * 1024 * 1024);
    assert_eq!(config.telegram.caption_limit, 1024);
    assert_eq!(config.ledger.backend, LedgerBackend::Sqlite);
    assert!(config.ledger.wal_mode);
    assert_eq!(config.normalizer.start_quality, 98);
    assert_eq!(config.normalizer.quality_step, 5);
    assert_eq!(config.normalizer.min_quality, 40);
    assert_eq!(config.sources.yande.tags, "order:random");
    assert_eq!(config.sources.pixiv.limit, 3);
    assert_eq!(config.sources.cosine.limit_per_tag, 50);
}

#[test]
fn unknown_field_in_nested_section_produces_error() {
    let toml = r#"
[sources.pixiv]
phpsesid = "abc"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "phpsesid"
                && suggestion.as_deref() == Some("phpsessid")
                && valid_keys.contains("artist_ids")
        })
    });
    assert!(has_unknown_key, "got: {errors:?}");
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "got: {err_str}"
    );
}

#[test]
fn invalid_type_is_reported_with_key_path() {
    let toml = r#"
[telegram]
channel_id = "not-a-number"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("channel_id"))),
        "got: {errors:?}"
    );
}

#[test]
fn unknown_backend_is_rejected() {
    let toml = r#"
[ledger]
backend = "postgres"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Validation errors are collected rather than failing fast.
#[test]
fn validation_collects_every_error() {
    let toml = r#"
[normalizer]
quality_step = 0

[sources.cosine]
enabled = true
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(messages.iter().any(|m| m.contains("quality_step")));
    assert!(messages.iter().any(|m| m.contains("sources.cosine.tags")));
    assert!(messages.iter().any(|m| m.contains("channel_id")));
    assert!(messages.iter().any(|m| m.contains("bot_token")));
}

#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "mtcacg.toml",
            r#"
[telegram]
channel_id = -1
"#,
        )?;
        jail.set_env("MTCACG_TELEGRAM_BOT_TOKEN", "xyz-from-env");
        jail.set_env("MTCACG_TELEGRAM_CHANNEL_ID", "-1002");
        jail.set_env("MTCACG_LEDGER_D1_ACCOUNT_ID", "acct-env");
        jail.set_env("MTCACG_SOURCES_PIXIV_PHPSESSID", "sess-env");

        let config: MtcConfig = mtcacg_config::loader::build_figment().extract()?;
        assert_eq!(config.telegram.bot_token.as_deref(), Some("xyz-from-env"));
        assert_eq!(config.telegram.channel_id, Some(-1002));
        assert_eq!(config.ledger.d1.account_id.as_deref(), Some("acct-env"));
        assert_eq!(config.sources.pixiv.phpsessid.as_deref(), Some("sess-env"));
        Ok(())
    });
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "chanel_id".to_string(),
        suggestion: Some("channel_id".to_string()),
        valid_keys: "bot_token, channel_id".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `channel_id`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("chanel_id"));
}
