//! Article document model
//!
//! Pure data: the inline format mask, text runs, blocks, lists and figures
//! produced while walking one source document.

use bitflags::bitflags;

bitflags! {
    /// Inline formatting flags active over a run of text.
    ///
    /// Bit order doubles as nesting priority: higher bits are rendered as
    /// outer tags, lower bits as inner ones.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatMask: u8 {
        const CURSIVE   = 1 << 0;
        const STRONG    = 1 << 1;
        const STRIKE    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const LINK      = 1 << 4;
        const QUOTE     = 1 << 5;
    }
}

/// Output tag emitted for a single format flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineTag {
    Italic,
    Bold,
    Del,
    Ins,
    Anchor,
    Quote,
}

impl InlineTag {
    /// All tags in ascending flag order (innermost first)
    pub const ALL: [InlineTag; 6] = [
        InlineTag::Italic,
        InlineTag::Bold,
        InlineTag::Del,
        InlineTag::Ins,
        InlineTag::Anchor,
        InlineTag::Quote,
    ];

    /// The flag this tag represents
    pub fn flag(self) -> FormatMask {
        match self {
            InlineTag::Italic => FormatMask::CURSIVE,
            InlineTag::Bold => FormatMask::STRONG,
            InlineTag::Del => FormatMask::STRIKE,
            InlineTag::Ins => FormatMask::UNDERLINE,
            InlineTag::Anchor => FormatMask::LINK,
            InlineTag::Quote => FormatMask::QUOTE,
        }
    }

    /// Element name in the output dialect
    pub fn name(self) -> &'static str {
        match self {
            InlineTag::Italic => "i",
            InlineTag::Bold => "b",
            InlineTag::Del => "del",
            InlineTag::Ins => "ins",
            InlineTag::Anchor => "a",
            InlineTag::Quote => "q",
        }
    }
}

/// A maximal span of text sharing one format mask and link target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub mask: FormatMask,
    /// Only meaningful while `mask` contains [`FormatMask::LINK`]
    pub link: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>, mask: FormatMask) -> Self {
        Self {
            text: text.into(),
            mask,
            link: None,
        }
    }

    /// A run inside an anchor pointing at `href`
    pub fn linked(text: impl Into<String>, mask: FormatMask, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mask: mask | FormatMask::LINK,
            link: Some(href.into()),
        }
    }

    /// Link target, if the run is inside an anchor
    pub fn href(&self) -> Option<&str> {
        if self.mask.contains(FormatMask::LINK) {
            self.link.as_deref()
        } else {
            None
        }
    }
}

/// One structural unit (paragraph, heading, blockquote, list item)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub tag: String,
    pub runs: Vec<Run>,
}

impl Block {
    pub fn new(tag: impl Into<String>, runs: Vec<Run>) -> Self {
        Self {
            tag: tag.into(),
            runs,
        }
    }
}

/// Kind of list wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ul" => Some(ListKind::Unordered),
            "ol" => Some(ListKind::Ordered),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// A list of `li` blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<Block>,
}

/// Media carried by a figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    Iframe,
    Img,
    Video,
}

impl FigureKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "iframe" => Some(FigureKind::Iframe),
            "img" => Some(FigureKind::Img),
            "video" => Some(FigureKind::Video),
            _ => None,
        }
    }
}

/// A resolved figure.
///
/// For images and videos `url` is a local asset reference; for iframes it is
/// the decoded third-party URL, turned into an embed at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub kind: FigureKind,
    pub url: String,
    pub caption: String,
}
