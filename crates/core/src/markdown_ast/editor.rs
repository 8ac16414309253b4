use crate::markdown_ast::comrak;
use crate::markdown_ast::types::*;

/// High-level API for Markdown AST operations
pub struct MarkdownEditor;

impl MarkdownEditor {
    /// Append a fragment at the end of a named section
    ///
    /// # Errors
    /// * `SectionNotFound` - No heading matches `section`
    /// * `EmptyDocument` - Input is empty or whitespace-only
    pub fn append_to_section(
        input: &str,
        section: &SectionMatch,
        fragment: &str,
    ) -> Result<InsertResult, MarkdownAstError> {
        comrak::append_to_section(input, section, fragment)
    }

    /// Headings and code blocks of a document body
    pub fn outline(input: &str) -> Outline {
        comrak::outline(input)
    }

    /// Check if a section exists in the document
    pub fn section_exists(input: &str, section: &SectionMatch) -> bool {
        comrak::outline(input).headings.iter().any(|h| comrak::matches_heading(h, section))
    }
}
