//! List assembly
//!
//! Only one level of nesting is supported: the inner markup of each `li`
//! is treated as flat inline content.

use std::ops::Range;

use crate::ast::{Block, FormatMask, List, ListKind};
use crate::inline::extract_runs;
use crate::scan::{Scanner, Unclosed};

/// Collect the `li` children found in `src[span]`, the content span of a
/// list element.
///
/// Children with any other tag name are skipped. A child without a closer
/// fails the whole list.
pub fn assemble_list(
    src: &str,
    span: Range<usize>,
    kind: ListKind,
) -> Result<List, Unclosed<'_>> {
    let mut items = Vec::new();

    for child in Scanner::bounded(src, span) {
        let child = child?;
        if child.name == "li" {
            items.push(Block::new(
                "li",
                extract_runs(child.content, FormatMask::empty()),
            ));
        }
    }

    Ok(List { kind, items })
}
