// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Miette diagnostics for configuration errors.
//!
//! Deserialization errors from figment are mapped onto [`ConfigError`] with a
//! span into the offending TOML file when it can be found, and unknown keys
//! get a "did you mean" hint ranked by Jaro-Winkler similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Below this similarity an unknown key gets no suggestion.
const MIN_SIMILARITY: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(mtcacg::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Keys accepted by the enclosing section, comma separated.
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(mtcacg::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `telegram.channel_id`.
        key: String,
        detail: String,
        expected: String,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but breaks a cross-field rule.
    #[error("{message}")]
    #[diagnostic(code(mtcacg::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(mtcacg::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// TOML documents that fed a figment, by display name.
struct Documents<'a>(&'a [(String, String)]);

impl Documents<'_> {
    /// The document the error came from. Inline strings carry no file
    /// metadata, so a lone document is assumed to be the origin.
    fn origin(&self, error: &figment::Error) -> Option<(&str, &str)> {
        let file = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });

        match (file, self.0) {
            (Some(file), docs) => docs
                .iter()
                .find(|(name, _)| *name == file)
                .map(|(name, content)| (name.as_str(), content.as_str())),
            (None, [(name, content)]) => Some((name.as_str(), content.as_str())),
            (None, _) => None,
        }
    }

    fn locate(
        &self,
        error: &figment::Error,
        section: &[String],
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((name, content)) = self.origin(error) else {
            return (None, None);
        };
        match find_key_offset(content, section, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.to_string())),
            ),
            None => (None, None),
        }
    }
}

/// Maps every error inside a `figment::Error` to a [`ConfigError`].
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let documents = Documents(toml_sources);

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = documents.locate(&error, &path, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, *expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((key, section)) => documents.locate(&error, section, key),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) if path.is_empty() => {
                    ConfigError::Other(format!("missing key `{field}`"))
                }
                Kind::MissingField(field) => {
                    ConfigError::Other(format!("missing key `{field}` in [{}]", path.join(".")))
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Byte offset of `key` inside the `[section]` table of `content`, or from the
/// top of the document when `section` is empty.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let start = if section.is_empty() {
        0
    } else {
        let header = format!("[{}]", section.join("."));
        content.find(&header)? + header.len()
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && !section.is_empty() {
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, valid_keys: &[S]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key.as_ref()), key.as_ref()))
        .filter(|(score, _)| *score > MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_key() {
        let valid = ["enabled", "phpsessid", "artist_ids", "limit"];
        assert_eq!(suggest_key("phpsesid", &valid), Some("phpsessid".to_string()));
        assert_eq!(suggest_key("zzzzzz", &["bot_token", "channel_id"]), None);
    }

    #[test]
    fn key_offset_stays_inside_its_table() {
        let content = "[telegram]\nlimt = 1\n\n[sources.pixiv]\nlimt = 3\n";
        let pixiv = vec!["sources".to_string(), "pixiv".to_string()];
        let offset = find_key_offset(content, &pixiv, "limt").expect("offset");
        assert_eq!(&content[offset..offset + 8], "limt = 3");

        let cosine = vec!["sources".to_string(), "cosine".to_string()];
        assert_eq!(find_key_offset(content, &cosine, "limt"), None);

        let telegram = vec!["telegram".to_string()];
        let offset = find_key_offset(content, &telegram, "limt").expect("offset");
        assert_eq!(&content[offset..offset + 8], "limt = 1");
    }

    #[test]
    fn prefix_of_another_key_is_not_matched() {
        let content = "[sources.cosine]\ntags_extra = 1\ntags = [\"a\"]\n";
        let section = vec!["sources".to_string(), "cosine".to_string()];
        let offset = find_key_offset(content, &section, "tags").expect("offset");
        assert!(content[offset..].starts_with("tags = "));
    }
}
