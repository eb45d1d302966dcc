// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mtcacg config` command implementation.

use mtcacg_config::MtcConfig;
use mtcacg_core::MtcError;

const REDACTED: &str = "<redacted>";

fn redact(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some(REDACTED.to_string());
    }
}

/// Renders the effective configuration as TOML with credentials masked.
pub fn render_effective(config: &MtcConfig) -> Result<String, MtcError> {
    let mut config = config.clone();
    redact(&mut config.telegram.bot_token);
    redact(&mut config.ledger.d1.api_token);
    redact(&mut config.sources.pixiv.phpsessid);

    toml::to_string_pretty(&config)
        .map_err(|e| MtcError::Internal(format!("failed to render configuration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_masked() {
        let mut config = MtcConfig::default();
        config.telegram.bot_token = Some("123:secret-token".into());
        config.telegram.channel_id = Some(-1001);
        config.sources.pixiv.phpsessid = Some("cookie-value".into());

        let rendered = render_effective(&config).expect("render");
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("cookie-value"));
        assert!(rendered.contains("bot_token = \"<redacted>\""));
        assert!(rendered.contains("channel_id = -1001"));
        assert!(rendered.contains("[sources.yande]"));
    }

    #[test]
    fn unset_credentials_stay_unset() {
        let rendered = render_effective(&MtcConfig::default()).expect("render");
        assert!(!rendered.contains(REDACTED));
    }
}
