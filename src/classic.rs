//! Bridge from classic (pre-block) content to block-annotated content.
//!
//! Classic content separates paragraphs with blank lines and may contain
//! shortcodes such as `[gallery]` or `[caption]...[/caption]`. Converting it
//! lets the block renderer handle both kinds of content.

use std::borrow::Cow;

use crate::tokenizer::has_blocks;

/// Converts legacy content into a block-annotated document.
pub trait LegacyBridge {
    fn to_blocks<'a>(&self, content: &'a str) -> Cow<'a, str>;
}

/// Paragraph and shortcode conversion for classic content.
///
/// - each blank-line separated paragraph becomes a `core/paragraph` block;
/// - a paragraph opening with a shortcode `[tag ...]` starts a
///   `core/shortcode` block that runs up to the paragraph holding `[/tag]`
///   (or is just that paragraph when no closer follows).
///
/// Content that already contains blocks is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicContent;

impl LegacyBridge for ClassicContent {
    fn to_blocks<'a>(&self, content: &'a str) -> Cow<'a, str> {
        if has_blocks(content) {
            return Cow::Borrowed(content);
        }

        let normalized = content.replace("\r\n", "\n");
        let paragraphs: Vec<&str> = normalized
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let mut blocks = Vec::new();
        let mut i = 0;
        while i < paragraphs.len() {
            let paragraph = paragraphs[i];
            match shortcode_tag(paragraph) {
                Some(tag) => {
                    let closer = format!("[/{tag}]");
                    let end = paragraphs[i..]
                        .iter()
                        .position(|p| p.contains(&closer))
                        .map_or(i, |offset| i + offset);
                    let body = paragraphs[i..=end].join("\n\n");
                    blocks.push(format!(
                        "<!-- wp:core/shortcode -->{body}<!-- /wp:core/shortcode -->"
                    ));
                    i = end + 1;
                }
                None => {
                    blocks.push(format!(
                        "<!-- wp:core/paragraph -->\n<p>{paragraph}</p>\n<!-- /wp:core/paragraph -->"
                    ));
                    i += 1;
                }
            }
        }

        Cow::Owned(blocks.join("\n\n"))
    }
}

/// The tag of a shortcode opening the paragraph, e.g. `gallery` for
/// `[gallery ids="1,2"]`.
fn shortcode_tag(paragraph: &str) -> Option<&str> {
    let rest = paragraph.strip_prefix('[')?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    match rest[end..].chars().next() {
        Some(']') | Some(' ') | Some('/') => Some(&rest[..end]),
        _ => None,
    }
}
