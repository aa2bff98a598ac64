//! Inline run extraction
//!
//! Turns the inner markup of one block into ordered [`Run`]s. Every text
//! span between two tags becomes a run carrying the mask (and link target)
//! active at that point.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{FormatMask, Run};

/// Inline tag names and the flag they toggle. `a` is handled separately
/// because it also carries a link target.
pub const INLINE_TAGS: &[(&str, FormatMask)] = &[
    ("b", FormatMask::STRONG),
    ("strong", FormatMask::STRONG),
    ("i", FormatMask::CURSIVE),
    ("em", FormatMask::CURSIVE),
    ("u", FormatMask::UNDERLINE),
    ("ins", FormatMask::UNDERLINE),
    ("s", FormatMask::STRIKE),
    ("strike", FormatMask::STRIKE),
    ("del", FormatMask::STRIKE),
    ("q", FormatMask::QUOTE),
];

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="?([^"\s>]+)"?"#).unwrap());

/// Look up the flag toggled by an inline tag name
pub fn inline_flag(name: &str) -> Option<FormatMask> {
    INLINE_TAGS
        .iter()
        .find(|(tag, _)| *tag == name)
        .map(|(_, flag)| *flag)
}

/// Leading `[a-z0-9]` characters of a tag body
fn tag_name(body: &str) -> &str {
    let end = body
        .bytes()
        .position(|b| !(b.is_ascii_lowercase() || b.is_ascii_digit()))
        .unwrap_or(body.len());
    &body[..end]
}

/// Extract the runs of one block's inner markup.
///
/// `initial` seeds the active mask (blockquote content starts with
/// [`FormatMask::QUOTE`]). Unknown tags are consumed without effect.
pub fn extract_runs(inner: &str, initial: FormatMask) -> Vec<Run> {
    let bytes = inner.as_bytes();
    let mut runs = Vec::new();
    let mut mask = initial;
    let mut link: Option<String> = None;
    let mut text_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        push_run(&mut runs, &inner[text_start..pos], mask, &link);

        let tag_end = bytes[pos + 1..]
            .iter()
            .position(|&b| b == b'>')
            .map_or(bytes.len(), |i| pos + 1 + i);
        apply_tag(&inner[pos + 1..tag_end], &mut mask, &mut link);

        pos = (tag_end + 1).min(bytes.len());
        text_start = pos;
    }

    push_run(&mut runs, &inner[text_start..], mask, &link);
    runs
}

fn push_run(runs: &mut Vec<Run>, text: &str, mask: FormatMask, link: &Option<String>) {
    if text.is_empty() {
        return;
    }
    runs.push(Run {
        text: text.to_string(),
        mask,
        link: link.clone(),
    });
}

fn apply_tag(body: &str, mask: &mut FormatMask, link: &mut Option<String>) {
    let body = body.trim_start();

    if let Some(closing) = body.strip_prefix('/') {
        match tag_name(closing.trim_start()) {
            "a" => {
                mask.remove(FormatMask::LINK);
                *link = None;
            }
            name => {
                if let Some(flag) = inline_flag(name) {
                    mask.remove(flag);
                }
            }
        }
        return;
    }

    match tag_name(body) {
        "a" => {
            mask.insert(FormatMask::LINK);
            *link = HREF.captures(body).map(|c| c[1].to_string());
        }
        name => {
            if let Some(flag) = inline_flag(name) {
                mask.insert(flag);
            }
        }
    }
}
