//! Source page clean-up
//!
//! Cuts the article body out of a full page and normalises it so that the
//! block scanner only ever sees the supported top-level tags.

use once_cell::sync::Lazy;
use regex::Regex;
use telegraph_core::utilities::{collapse_whitespace, LINE_BREAK_MARKER};

use crate::{Result, TelegraphError};

static ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<article[^>]*>(.+)</article>").unwrap());
static BREAK_BEFORE_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<br(?:\s[^>]*)?/?>\s*</(address|h\d|p|blockquote)>").unwrap()
});
static EMPTY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p>(?:<br>)?</p>").unwrap());
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<hr[^>]*>(?:[^<]*</hr>)?").unwrap());
static BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br(?:\s[^>]*)?/?>").unwrap());
static BLOCK_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(h\d|address|p|ul|ol|blockquote)\s[^>]*>").unwrap()
});
static LOCAL_LINK_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<p>[^<]*<a[^>]+href="/[^>]+>[^<]+</a>[^<]*</p>"#).unwrap()
});
static LOCAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a[^>]+href="/[^>]+>[^<]+</a>"#).unwrap());
static FOOTER_FIGURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<figure><img[^>]+><figcaption></figcaption></figure>\s*$").unwrap()
});

/// Extract and normalise the article body of a source page.
///
/// Literal line breaks become [`LINE_BREAK_MARKER`]; the converter turns
/// them back into `<br />` after rendering.
pub fn prepare_body(page: &str) -> Result<String> {
    let body = ARTICLE
        .captures(page.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| TelegraphError::MalformedDocument("no article container".to_string()))?;

    let marker = LINE_BREAK_MARKER.to_string();

    let body = BREAK_BEFORE_CLOSE.replace_all(body, "</$1>");
    let body = EMPTY_PARAGRAPH.replace_all(&body, "");
    let body = RULE.replace_all(&body, "");
    let body = BREAK.replace_all(&body, marker.as_str());
    let body = BLOCK_ATTRIBUTES.replace_all(&body, "<$1>");
    let body = LOCAL_LINK_PARAGRAPH.replace_all(&body, "");
    let body = LOCAL_LINK.replace_all(&body, "");
    let body = FOOTER_FIGURE.replace(&body, "");

    Ok(collapse_whitespace(&body).trim().to_string())
}
