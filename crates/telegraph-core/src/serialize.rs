//! Nested-tag rendering
//!
//! Re-emits a run sequence as output markup. Between two runs only the tags
//! needed to move from one mask to the next are closed and opened. Open tags
//! always nest by flag priority: the highest active flag is the outermost
//! element.

use smallvec::SmallVec;

use crate::ast::{Block, FormatMask, InlineTag, List, Run};

/// Tags of one mask; six flags never spill to the heap
pub type TagList = SmallVec<[InlineTag; 6]>;

/// Tags for every flag in `mask`, lowest flag (innermost) first
pub fn tags_for_mask(mask: FormatMask) -> TagList {
    InlineTag::ALL
        .iter()
        .copied()
        .filter(|tag| mask.contains(tag.flag()))
        .collect()
}

/// Close/open sequence moving the render state between two masks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Tags to close, in emission order (innermost first)
    pub close: TagList,
    /// Tags to open, in emission order (outermost first)
    pub open: TagList,
}

impl Transition {
    /// Close everything in `from`, then open everything in `to`
    pub fn full(from: FormatMask, to: FormatMask) -> Self {
        Self::between(from, to, FormatMask::empty())
    }

    /// Close and reopen everything except the `stable` outer tags
    fn between(from: FormatMask, to: FormatMask, stable: FormatMask) -> Self {
        let mut open = tags_for_mask(to.difference(stable));
        open.reverse();
        Self {
            close: tags_for_mask(from.difference(stable)),
            open,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty() && self.open.is_empty()
    }
}

fn highest_flag(mask: FormatMask) -> FormatMask {
    let bits = mask.bits();
    FormatMask::from_bits_truncate(1u8 << (7 - bits.leading_zeros()))
}

fn flags_above(flag: FormatMask) -> FormatMask {
    FormatMask::from_bits_truncate(!((flag.bits() << 1).wrapping_sub(1)))
}

/// Compute the tag transition from `from` to `to`.
///
/// Any transition that turns a flag on closes every open tag and reopens the
/// new mask in priority order. A pure reduction closes the dropped flags and
/// leaves the tags outside the highest dropped flag untouched; common flags
/// nested inside it are closed and reopened to keep the output well formed.
pub fn transition(from: FormatMask, to: FormatMask) -> Transition {
    if from == to {
        return Transition::default();
    }

    let changed = from.symmetric_difference(to);
    let added = changed & to;
    if !added.is_empty() {
        return Transition::full(from, to);
    }

    let dropped = changed & from;
    let stable = from & flags_above(highest_flag(dropped));
    Transition::between(from, to, stable)
}

fn write_transition(step: &Transition, href: Option<&str>, out: &mut String) {
    for tag in &step.close {
        out.push_str("</");
        out.push_str(tag.name());
        out.push('>');
    }

    for tag in &step.open {
        out.push('<');
        out.push_str(tag.name());
        if let (InlineTag::Anchor, Some(href)) = (tag, href) {
            out.push_str(" href=\"");
            out.push_str(&href.replace('"', "&quot;"));
            out.push('"');
        }
        out.push('>');
    }
}

/// Render a run sequence, closing every tag at the end
pub fn render_runs(runs: &[Run], out: &mut String) {
    let mut mask = FormatMask::empty();
    let mut link: Option<&str> = None;

    for run in runs {
        let relink = mask.contains(FormatMask::LINK)
            && run.mask.contains(FormatMask::LINK)
            && link != run.href();

        let step = if relink {
            Transition::full(mask, run.mask)
        } else {
            transition(mask, run.mask)
        };
        write_transition(&step, run.href(), out);

        mask = run.mask;
        link = run.href();
        out.push_str(&run.text);
    }

    write_transition(&transition(mask, FormatMask::empty()), None, out);
}

/// Render a block wrapped in its own tag
pub fn render_block(block: &Block) -> String {
    let mut inner = String::new();
    render_runs(&block.runs, &mut inner);

    let mut out = String::with_capacity(inner.len() + 2 * block.tag.len() + 5);
    out.push('<');
    out.push_str(&block.tag);
    out.push('>');
    out.push_str(inner.trim());
    out.push_str("</");
    out.push_str(&block.tag);
    out.push('>');
    out
}

/// Render a list and its items
pub fn render_list(list: &List) -> String {
    let tag = list.kind.tag();
    let mut out = format!("<{}>", tag);
    for item in &list.items {
        out.push_str(&render_block(item));
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
    out
}
