use std::ops::RangeInclusive;

use thiserror::Error;

/// Configuration for section matching
#[derive(Debug, Clone)]
pub struct SectionMatch {
    /// The section title to find (compared after trimming)
    pub title: String,
    /// Heading level to require, if any
    pub level: Option<u8>,
    /// Use case-sensitive matching (default: false)
    pub case_sensitive: bool,
}

impl SectionMatch {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), level: None, case_sensitive: false }
    }

    /// Build a matcher from a markdown heading line such as `## Captured`.
    pub fn from_heading_line(line: &str) -> Self {
        let trimmed = line.trim();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if hashes == 0 || hashes > 6 {
            return Self::new(trimmed);
        }
        Self {
            title: trimmed[hashes..].trim().to_string(),
            level: Some(hashes as u8),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }
}

/// A heading found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingInfo {
    /// The heading text content
    pub title: String,
    /// The heading level (1-6)
    pub level: u8,
    /// 1-indexed first source line of the heading
    pub line: usize,
}

/// Block structure of a document relevant to indexing
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub headings: Vec<HeadingInfo>,
    /// 1-indexed inclusive line ranges of code blocks
    pub code_blocks: Vec<RangeInclusive<usize>>,
}

impl Outline {
    pub fn in_code_block(&self, line: usize) -> bool {
        self.code_blocks.iter().any(|r| r.contains(&line))
    }
}

/// Result of an insertion operation
#[derive(Debug, Clone)]
pub struct InsertResult {
    /// The modified markdown content
    pub content: String,
    /// Information about the matched section
    pub matched_heading: HeadingInfo,
}

#[derive(Debug, Error)]
pub enum MarkdownAstError {
    #[error("section not found: {0}")]
    SectionNotFound(String),

    #[error("document is empty or contains no content")]
    EmptyDocument,
}
