//! Markdown document parsing into objects, traits, references, dates and tags.
//!
//! A file becomes one file-level object plus one embedded `section` object per
//! heading. Inline annotations are extracted line by line from the body,
//! skipping frontmatter, code blocks and inline code spans.

pub mod document;
mod inline;
pub mod refs;
pub mod tags;
pub mod traits;
pub mod types;

pub use document::{ParseError, parse_document, slugify};
pub use traits::{TraitMatch, find_traits};
pub use types::{
    DateEntry, DateSource, Document, ParsedObject, ParsedRef, ParsedTag, ParsedTrait,
    TraitSpan,
};
