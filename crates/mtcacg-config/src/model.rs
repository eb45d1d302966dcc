// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the MtcACG harvester.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level MtcACG configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MtcConfig {
    /// Process-level settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Telegram bot and channel settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// History ledger backend settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// JPEG re-encoding settings for oversized payloads.
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Gallery source pollers.
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl MtcConfig {
    /// Whether at least one gallery poller is enabled.
    pub fn any_source_enabled(&self) -> bool {
        self.sources.yande.enabled
            || self.sources.pixiv.enabled
            || self.sources.manyacg.enabled
            || self.sources.cosine.enabled
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot and destination channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Numeric id of the destination channel.
    #[serde(default)]
    pub channel_id: Option<i64>,

    /// User ids or usernames allowed to drive the manual upload flow.
    /// An empty list lets nobody in.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Caption used for manual uploads that arrive without one.
    #[serde(default = "default_caption")]
    pub default_caption: String,

    /// Payloads above this size are re-encoded before upload.
    #[serde(default = "default_max_photo_bytes")]
    pub max_photo_bytes: usize,

    /// Captions are truncated to this many characters.
    #[serde(default = "default_caption_limit")]
    pub caption_limit: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: None,
            allowed_users: Vec::new(),
            default_caption: default_caption(),
            max_photo_bytes: default_max_photo_bytes(),
            caption_limit: default_caption_limit(),
        }
    }
}

fn default_caption() -> String {
    "MtcACG:TG".to_string()
}

fn default_max_photo_bytes() -> usize {
    9 * 1024 * 1024
}

fn default_caption_limit() -> usize {
    1024
}

/// Durable store behind the history ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// Local SQLite database file.
    #[default]
    Sqlite,
    /// Cloudflare D1 over its HTTP query API.
    D1,
}

/// History ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Cloudflare D1 settings, used when `backend = "d1"`.
    #[serde(default)]
    pub d1: D1Config,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            d1: D1Config::default(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("mtcacg").join("ledger.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ledger.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Cloudflare D1 credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct D1Config {
    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub database_id: Option<String>,

    /// Base URL of the Cloudflare API.
    #[serde(default = "default_d1_endpoint")]
    pub endpoint: String,
}

impl Default for D1Config {
    fn default() -> Self {
        Self {
            account_id: None,
            api_token: None,
            database_id: None,
            endpoint: default_d1_endpoint(),
        }
    }
}

fn default_d1_endpoint() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

/// Size normalizer configuration.
///
/// Quality starts at `start_quality` and drops by `quality_step` per attempt
/// without going below `min_quality`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizerConfig {
    #[serde(default = "default_start_quality")]
    pub start_quality: u8,

    #[serde(default = "default_quality_step")]
    pub quality_step: u8,

    #[serde(default = "default_min_quality")]
    pub min_quality: u8,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            start_quality: default_start_quality(),
            quality_step: default_quality_step(),
            min_quality: default_min_quality(),
        }
    }
}

fn default_start_quality() -> u8 {
    98
}

fn default_quality_step() -> u8 {
    5
}

fn default_min_quality() -> u8 {
    40
}

/// Delay and cap settings shared by every poller, resolved from a source section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub item_delay: Duration,
    pub family_item_delay: Duration,
    pub cycle_delay: Duration,
    pub error_delay: Duration,
    pub max_deliveries_per_cycle: Option<usize>,
}

/// All gallery sources. Every source is disabled by default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    #[serde(default)]
    pub yande: YandeConfig,

    #[serde(default)]
    pub pixiv: PixivConfig,

    #[serde(default)]
    pub manyacg: ManyAcgConfig,

    #[serde(default)]
    pub cosine: CosineConfig,
}

/// yande.re poller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct YandeConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_yande_base_url")]
    pub base_url: String,

    /// Posts requested per cycle.
    #[serde(default = "default_yande_limit")]
    pub limit: usize,

    /// Search expression passed as the `tags` query parameter.
    #[serde(default = "default_yande_tags")]
    pub tags: String,

    /// Maximum number of posts delivered from one parent set.
    #[serde(default = "default_yande_family_limit")]
    pub family_limit: usize,

    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,

    #[serde(default = "default_yande_family_item_delay_secs")]
    pub family_item_delay_secs: u64,

    #[serde(default = "default_ten_minutes")]
    pub cycle_delay_secs: u64,

    #[serde(default = "default_one_minute")]
    pub error_delay_secs: u64,

    #[serde(default)]
    pub max_deliveries_per_cycle: Option<usize>,
}

impl Default for YandeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_yande_base_url(),
            limit: default_yande_limit(),
            tags: default_yande_tags(),
            family_limit: default_yande_family_limit(),
            item_delay_secs: default_item_delay_secs(),
            family_item_delay_secs: default_yande_family_item_delay_secs(),
            cycle_delay_secs: default_ten_minutes(),
            error_delay_secs: default_one_minute(),
            max_deliveries_per_cycle: None,
        }
    }
}

impl YandeConfig {
    pub fn schedule(&self) -> PollSchedule {
        schedule(
            self.item_delay_secs,
            self.family_item_delay_secs,
            self.cycle_delay_secs,
            self.error_delay_secs,
            self.max_deliveries_per_cycle,
        )
    }
}

fn default_yande_base_url() -> String {
    "https://yande.re".to_string()
}

fn default_yande_limit() -> usize {
    1
}

fn default_yande_tags() -> String {
    "order:random".to_string()
}

fn default_yande_family_limit() -> usize {
    10
}

fn default_yande_family_item_delay_secs() -> u64 {
    1
}

/// Pixiv artist poller (cookie mode).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PixivConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_pixiv_base_url")]
    pub base_url: String,

    /// `PHPSESSID` cookie of a logged-in session.
    #[serde(default)]
    pub phpsessid: Option<String>,

    /// Artists whose newest works are polled.
    #[serde(default)]
    pub artist_ids: Vec<String>,

    /// Newest works examined per artist per cycle.
    #[serde(default = "default_pixiv_limit")]
    pub limit: usize,

    /// Maximum pages delivered from one multi-page work.
    #[serde(default = "default_pixiv_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,

    #[serde(default = "default_pixiv_family_item_delay_secs")]
    pub family_item_delay_secs: u64,

    #[serde(default = "default_ten_minutes")]
    pub cycle_delay_secs: u64,

    #[serde(default = "default_one_minute")]
    pub error_delay_secs: u64,

    #[serde(default)]
    pub max_deliveries_per_cycle: Option<usize>,
}

impl Default for PixivConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_pixiv_base_url(),
            phpsessid: None,
            artist_ids: Vec::new(),
            limit: default_pixiv_limit(),
            max_pages: default_pixiv_max_pages(),
            item_delay_secs: default_item_delay_secs(),
            family_item_delay_secs: default_pixiv_family_item_delay_secs(),
            cycle_delay_secs: default_ten_minutes(),
            error_delay_secs: default_one_minute(),
            max_deliveries_per_cycle: None,
        }
    }
}

impl PixivConfig {
    pub fn schedule(&self) -> PollSchedule {
        schedule(
            self.item_delay_secs,
            self.family_item_delay_secs,
            self.cycle_delay_secs,
            self.error_delay_secs,
            self.max_deliveries_per_cycle,
        )
    }
}

fn default_pixiv_base_url() -> String {
    "https://www.pixiv.net".to_string()
}

fn default_pixiv_limit() -> usize {
    3
}

fn default_pixiv_max_pages() -> usize {
    5
}

fn default_pixiv_family_item_delay_secs() -> u64 {
    3
}

/// ManyACG random artwork poller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ManyAcgConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_manyacg_base_url")]
    pub base_url: String,

    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,

    #[serde(default = "default_item_delay_secs")]
    pub family_item_delay_secs: u64,

    #[serde(default = "default_five_minutes")]
    pub cycle_delay_secs: u64,

    #[serde(default = "default_three_minutes")]
    pub error_delay_secs: u64,

    #[serde(default)]
    pub max_deliveries_per_cycle: Option<usize>,
}

impl Default for ManyAcgConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_manyacg_base_url(),
            item_delay_secs: default_item_delay_secs(),
            family_item_delay_secs: default_item_delay_secs(),
            cycle_delay_secs: default_five_minutes(),
            error_delay_secs: default_three_minutes(),
            max_deliveries_per_cycle: None,
        }
    }
}

impl ManyAcgConfig {
    pub fn schedule(&self) -> PollSchedule {
        schedule(
            self.item_delay_secs,
            self.family_item_delay_secs,
            self.cycle_delay_secs,
            self.error_delay_secs,
            self.max_deliveries_per_cycle,
        )
    }
}

fn default_manyacg_base_url() -> String {
    "https://manyacg.top".to_string()
}

/// pic.cosine.ren tag poller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CosineConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cosine_base_url")]
    pub base_url: String,

    /// Tags scanned in order every cycle.
    #[serde(default)]
    pub tags: Vec<String>,

    /// New images delivered per tag per cycle before moving to the next tag.
    #[serde(default = "default_cosine_limit_per_tag")]
    pub limit_per_tag: usize,

    #[serde(default = "default_cosine_page_size")]
    pub page_size: usize,

    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: u64,

    #[serde(default = "default_item_delay_secs")]
    pub family_item_delay_secs: u64,

    #[serde(default = "default_four_hours")]
    pub cycle_delay_secs: u64,

    #[serde(default = "default_one_minute")]
    pub error_delay_secs: u64,

    #[serde(default)]
    pub max_deliveries_per_cycle: Option<usize>,
}

impl Default for CosineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_cosine_base_url(),
            tags: Vec::new(),
            limit_per_tag: default_cosine_limit_per_tag(),
            page_size: default_cosine_page_size(),
            item_delay_secs: default_item_delay_secs(),
            family_item_delay_secs: default_item_delay_secs(),
            cycle_delay_secs: default_four_hours(),
            error_delay_secs: default_one_minute(),
            max_deliveries_per_cycle: None,
        }
    }
}

impl CosineConfig {
    pub fn schedule(&self) -> PollSchedule {
        schedule(
            self.item_delay_secs,
            self.family_item_delay_secs,
            self.cycle_delay_secs,
            self.error_delay_secs,
            self.max_deliveries_per_cycle,
        )
    }
}

fn default_cosine_base_url() -> String {
    "https://pic.cosine.ren".to_string()
}

fn default_cosine_limit_per_tag() -> usize {
    50
}

fn default_cosine_page_size() -> usize {
    32
}

fn schedule(
    item: u64,
    family_item: u64,
    cycle: u64,
    error: u64,
    max_deliveries_per_cycle: Option<usize>,
) -> PollSchedule {
    PollSchedule {
        item_delay: Duration::from_secs(item),
        family_item_delay: Duration::from_secs(family_item),
        cycle_delay: Duration::from_secs(cycle),
        error_delay: Duration::from_secs(error),
        max_deliveries_per_cycle,
    }
}

fn default_item_delay_secs() -> u64 {
    3
}

fn default_one_minute() -> u64 {
    60
}

fn default_three_minutes() -> u64 {
    180
}

fn default_five_minutes() -> u64 {
    300
}

fn default_ten_minutes() -> u64 {
    600
}

fn default_four_hours() -> u64 {
    4 * 60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_defaults_follow_their_cadence() {
        let sources = SourcesConfig::default();
        assert_eq!(
            sources.yande.schedule().cycle_delay,
            Duration::from_secs(600)
        );
        assert_eq!(
            sources.yande.schedule().family_item_delay,
            Duration::from_secs(1)
        );
        assert_eq!(
            sources.pixiv.schedule().family_item_delay,
            Duration::from_secs(3)
        );
        assert_eq!(
            sources.manyacg.schedule().cycle_delay,
            Duration::from_secs(300)
        );
        assert_eq!(
            sources.cosine.schedule().cycle_delay,
            Duration::from_secs(14_400)
        );
        assert_eq!(sources.cosine.page_size, 32);
    }

    #[test]
    fn backend_parses_lowercase() {
        let ledger: LedgerConfig = toml::from_str("backend = \"d1\"").unwrap();
        assert_eq!(ledger.backend, LedgerBackend::D1);
        assert_eq!(ledger.d1.endpoint, "https://api.cloudflare.com/client/v4");
    }

    #[test]
    fn nothing_enabled_by_default() {
        assert!(!MtcConfig::default().any_source_enabled());
    }
}
