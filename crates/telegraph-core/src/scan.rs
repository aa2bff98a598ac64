//! Structural block scanning
//!
//! Walks raw markup one top-level element at a time. The matcher does not
//! count nested openers: an element ends at the first closer carrying the
//! same name. It is only used on tags that never nest inside themselves in
//! the source dialect (top-level blocks, list items); anything else gets
//! truncated content.

use std::fmt;
use std::ops::Range;

/// An element located by [`scan_element`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    /// Tag name of the opening tag (`[a-z0-9]+`)
    pub name: &'a str,
    /// Markup between the opening tag and its closer
    pub content: &'a str,
    /// Byte span of `content` within the scanned source
    pub content_span: Range<usize>,
    /// Offset just past the closing tag
    pub next: usize,
}

/// Transient state of a single scan
#[derive(Debug, Default)]
struct Cursor {
    position: usize,
    tag_name_start: usize,
    tag_name_end: usize,
    content_start: usize,
    content_end: usize,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

/// Whether the `<` at `lt` starts `</name>` (or `</name ...>`)
fn closes(bytes: &[u8], lt: usize, name: &[u8]) -> bool {
    let rest = &bytes[lt + 1..];
    rest.first() == Some(&b'/')
        && rest[1..].starts_with(name)
        && matches!(rest.get(1 + name.len()), Some(&b) if b == b'>' || b.is_ascii_whitespace())
}

/// An opening tag whose closer never appears before the scan limit.
///
/// Void elements (`<img>`, `<video ...>`) and truncated markup end up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unclosed<'a> {
    pub name: &'a str,
    /// Offset of the opening `<`
    pub offset: usize,
}

impl fmt::Display for Unclosed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> at byte {} has no closing tag", self.name, self.offset)
    }
}

impl std::error::Error for Unclosed<'_> {}

/// Locate the next element starting at or after `from`.
///
/// Scanning stops at `limit` (or the end of `src`). Markup that does not
/// open a named element, such as comments or stray closers, is skipped.
/// Returns `Ok(None)` when no further opening tag exists and [`Unclosed`]
/// when one does but its closer is missing.
pub fn scan_element(
    src: &str,
    from: usize,
    limit: Option<usize>,
) -> Result<Option<Element<'_>>, Unclosed<'_>> {
    let end = limit.map_or(src.len(), |l| l.min(src.len()));
    let bytes = &src.as_bytes()[..end];
    let mut cursor = Cursor {
        position: from,
        ..Default::default()
    };
    let open_at = loop {
        let Some(lt) = find_byte(bytes, cursor.position, b'<') else {
            return Ok(None);
        };
        let mut pos = lt + 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        cursor.tag_name_start = pos;
        while pos < bytes.len() && is_name_byte(bytes[pos]) {
            pos += 1;
        }
        cursor.tag_name_end = pos;

        let named = cursor.tag_name_end > cursor.tag_name_start;
        let Some(gt) = find_byte(bytes, pos, b'>') else {
            if !named {
                return Ok(None);
            }
            return Err(Unclosed {
                name: &src[cursor.tag_name_start..cursor.tag_name_end],
                offset: lt,
            });
        };
        cursor.position = gt + 1;

        if named {
            cursor.content_start = cursor.position;
            break lt;
        }
    };

    let unclosed = Unclosed {
        name: &src[cursor.tag_name_start..cursor.tag_name_end],
        offset: open_at,
    };

    let name = unclosed.name.as_bytes();
    loop {
        let lt = find_byte(bytes, cursor.position, b'<').ok_or(unclosed)?;
        cursor.position = lt + 1;
        if closes(bytes, lt, name) {
            cursor.content_end = lt;
            break;
        }
    }

    let next = find_byte(bytes, cursor.content_end, b'>').ok_or(unclosed)? + 1;

    Ok(Some(Element {
        name: unclosed.name,
        content: &src[cursor.content_start..cursor.content_end],
        content_span: cursor.content_start..cursor.content_end,
        next,
    }))
}

/// Iterator over consecutive top-level elements.
///
/// Yields one [`Unclosed`] error at most and stops after it.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    src: &'a str,
    position: usize,
    limit: Option<usize>,
    failed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            position: 0,
            limit: None,
            failed: false,
        }
    }

    /// Scan only the elements inside `span`, a container's content span
    pub fn bounded(src: &'a str, span: Range<usize>) -> Self {
        Self {
            src,
            position: span.start,
            limit: Some(span.end),
            failed: false,
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Element<'a>, Unclosed<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match scan_element(self.src, self.position, self.limit) {
            Ok(Some(element)) => {
                self.position = element.next;
                Some(Ok(element))
            }
            Ok(None) => None,
            Err(unclosed) => {
                self.failed = true;
                Some(Err(unclosed))
            }
        }
    }
}
