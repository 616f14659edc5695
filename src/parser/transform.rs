//! HTML transforms applied before pattern matching

use crate::parser::ParserDescriptor;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static tag regex is valid"));

/// Removes every tag from the HTML, leaving only the text between tags
///
/// # Example
///
/// ```
/// use harvest_ripple::parser::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello <b>world</b>.</p>"), "Hello world.");
/// ```
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Extracts the visible text of a document
///
/// Unlike [`strip_tags`], this parses the document and skips the contents of
/// `<script>`, `<style>` and `<noscript>` elements.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);

    for node in document.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| {
                parent
                    .value()
                    .as_element()
                    .map(|element| matches!(element.name(), "script" | "style" | "noscript"))
            })
            .unwrap_or(false);

        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}

/// Transform selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    /// Match against the raw HTML
    None,
    /// Remove tags with [`strip_tags`]
    #[default]
    StripTags,
    /// Extract text with [`visible_text`]
    VisibleText,
}

impl TransformKind {
    /// Installs this transform on a descriptor
    pub fn apply_to(self, descriptor: ParserDescriptor) -> ParserDescriptor {
        match self {
            Self::None => descriptor,
            Self::StripTags => descriptor.with_transform(strip_tags),
            Self::VisibleText => descriptor.with_transform(visible_text),
        }
    }
}
