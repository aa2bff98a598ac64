//! telegraph-core - article markup model, scanning and rendering
//!
//! This crate holds the synchronous part of the import pipeline. It has no
//! I/O; the `telegraph` crate drives it and adds fetching, media and embeds.
//!
//! # Architecture
//!
//! ```text
//!                ┌─────────┐   ┌────────────────┐   ┌──────────┐
//! article body ─▶│ Scanner │──▶│ extract_runs   │──▶│ render_* │──▶ output markup
//!                └─────────┘   │ assemble_list  │   └──────────┘
//!                              └────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use telegraph_core::{extract_runs, render_block, Block, FormatMask, Scanner};
//!
//! let body = "<p>Hello <b>World</b></p>";
//! let element = Scanner::new(body).next().unwrap().unwrap();
//!
//! let block = Block::new(element.name, extract_runs(element.content, FormatMask::empty()));
//! assert_eq!(render_block(&block), "<p>Hello <b>World</b></p>");
//! ```

mod ast;
mod inline;
mod list;
mod scan;
mod serialize;
pub mod utilities;

pub use ast::{Block, Figure, FigureKind, FormatMask, InlineTag, List, ListKind, Run};
pub use inline::{extract_runs, inline_flag, INLINE_TAGS};
pub use list::assemble_list;
pub use scan::{scan_element, Element, Scanner, Unclosed};
pub use serialize::{
    render_block, render_list, render_runs, tags_for_mask, transition, TagList, Transition,
};
