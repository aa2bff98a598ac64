//! Text helpers shared by the conversion stages.

use once_cell::sync::Lazy;
use regex::Regex;

/// Internal stand-in for a literal line break, kept out of whitespace
/// collapsing until the final output is assembled
pub const LINE_BREAK_MARKER: char = '\u{19}';

/// Markup the marker turns back into
pub const LINE_BREAK: &str = "<br />";

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace into a single space
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").into_owned()
}

/// Replace every tag with a space and normalise whitespace
pub fn strip_tags(s: &str) -> String {
    let text = TAG.replace_all(s, " ");
    collapse_whitespace(&text).trim().to_string()
}

/// Turn line-break markers into explicit break elements
pub fn restore_line_breaks(s: &str) -> String {
    s.replace(LINE_BREAK_MARKER, LINE_BREAK)
}
