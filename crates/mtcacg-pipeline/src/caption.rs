// SPDX-FileCopyrightText: 2026 MtcACG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel captions and stored tag strings.

use mtcacg_core::ContentItem;

/// Renders the channel caption for `item`, truncated to `limit` characters.
///
/// ```text
/// Pixiv: Title [2/3]
/// Artist: someone
/// Tags: #a #b
/// ```
pub fn render_caption(item: &ContentItem, limit: usize) -> String {
    let mut caption = format!("{}: {}", item.label, item.title);
    if let Some(position) = item.position {
        caption.push_str(&format!(" [{}/{}]", position.index + 1, position.total));
    }
    if !item.attribution.is_empty() {
        caption.push_str("\nArtist: ");
        caption.push_str(&item.attribution);
    }
    let tags = item.caption_tags();
    if !tags.is_empty() {
        caption.push_str("\nTags: ");
        caption.push_str(&hashtags(tags));
    }
    truncate_chars(&caption, limit)
}

/// `#a #b`, with inner whitespace folded to `_` so each tag stays one hashtag.
pub fn hashtags(tags: &[String]) -> String {
    tags.iter()
        .filter(|tag| !tag.trim().is_empty())
        .map(|tag| {
            let folded: Vec<&str> = tag.split_whitespace().collect();
            format!("#{}", folded.join("_"))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tag column value: item tags followed by the source name.
pub fn stored_tags(item: &ContentItem) -> String {
    let mut parts: Vec<&str> = item.tags.iter().map(String::as_str).collect();
    parts.push(&item.source_name);
    parts.join(" ")
}

/// Cuts `text` to at most `limit` characters on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
