//! Markdown structure helpers backed by comrak.

pub mod comrak;
pub mod editor;
pub mod types;

// Re-export primary API
pub use editor::MarkdownEditor;
pub use types::{
    HeadingInfo, InsertResult, MarkdownAstError, Outline, SectionMatch,
};
