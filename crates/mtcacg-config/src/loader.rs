// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mtcacg.toml` > `~/.config/mtcacg/mtcacg.toml` > `/etc/mtcacg/mtcacg.toml`
//! with environment variable overrides via `MTCACG_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MtcConfig;

/// Env-key prefixes and the dotted paths they expand to, most specific first.
const SECTION_PREFIXES: &[(&str, &str)] = &[
    ("ledger_d1_", "ledger.d1."),
    ("sources_yande_", "sources.yande."),
    ("sources_pixiv_", "sources.pixiv."),
    ("sources_manyacg_", "sources.manyacg."),
    ("sources_cosine_", "sources.cosine."),
    ("daemon_", "daemon."),
    ("telegram_", "telegram."),
    ("ledger_", "ledger."),
    ("normalizer_", "normalizer."),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mtcacg/mtcacg.toml` (system-wide)
/// 3. `~/.config/mtcacg/mtcacg.toml` (user XDG config)
/// 4. `./mtcacg.toml` (local directory)
/// 5. `MTCACG_*` environment variables
pub fn load_config() -> Result<MtcConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MtcConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MtcConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MtcConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MtcConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MtcConfig::default()))
        .merge(Toml::file("/etc/mtcacg/mtcacg.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mtcacg/mtcacg.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mtcacg.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `MTCACG_TELEGRAM_BOT_TOKEN` must map to `telegram.bot_token`,
/// not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("MTCACG_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env var name onto a dotted config path.
///
/// Figment hands over the key in its original case, so it is lowercased here.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for (prefix, dotted) in SECTION_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{dotted}{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("ledger_d1_api_token"), "ledger.d1.api_token");
        assert_eq!(map_env_key("ledger_database_path"), "ledger.database_path");
        assert_eq!(
            map_env_key("sources_pixiv_phpsessid"),
            "sources.pixiv.phpsessid"
        );
        assert_eq!(
            map_env_key("sources_cosine_limit_per_tag"),
            "sources.cosine.limit_per_tag"
        );
        assert_eq!(map_env_key("unknown"), "unknown");
    }

    #[test]
    fn uppercase_env_keys_map_to_sections() {
        assert_eq!(map_env_key("LEDGER_D1_ACCOUNT_ID"), "ledger.d1.account_id");
        assert_eq!(map_env_key("TELEGRAM_CHANNEL_ID"), "telegram.channel_id");
        assert_eq!(
            map_env_key("Sources_Yande_Family_Limit"),
            "sources.yande.family_limit"
        );
    }
}
