//! Parsed document types.

use std::collections::BTreeMap;

use serde::Serialize;

/// Default type for files without a `type` frontmatter field.
pub const DEFAULT_OBJECT_TYPE: &str = "page";

/// Type given to heading objects.
pub const SECTION_TYPE: &str = "section";

/// Everything extracted from a single markdown file.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Vault-relative, slash-separated path including `.md`.
    pub file_path: String,
    /// File object first, then sections in document order.
    pub objects: Vec<ParsedObject>,
    pub traits: Vec<ParsedTrait>,
    pub refs: Vec<ParsedRef>,
    pub dates: Vec<DateEntry>,
    pub tags: Vec<ParsedTag>,
}

impl Document {
    /// The file-level object.
    pub fn file_object(&self) -> Option<&ParsedObject> {
        self.objects.first()
    }

    /// Innermost object whose line range contains `line`.
    pub fn object_at_line(&self, line: usize) -> Option<&ParsedObject> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.line_start <= line && line <= o.line_end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedObject {
    pub id: String,
    pub object_type: String,
    /// Heading text for section objects.
    pub heading: Option<String>,
    pub heading_level: Option<u8>,
    pub fields: BTreeMap<String, serde_json::Value>,
    /// 1-indexed, inclusive.
    pub line_start: usize,
    pub line_end: usize,
    pub parent_id: Option<String>,
    pub alias: Option<String>,
}

/// Exact location of a trait annotation.
///
/// `start..end` are byte offsets within the line. When the annotation was
/// matched after a list marker or whitespace that character is part of the
/// span and recorded as `prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraitSpan {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub prefix: Option<char>,
}

impl TraitSpan {
    /// Byte column of the `@`.
    pub fn column(&self) -> usize {
        self.start + self.prefix.map_or(0, char::len_utf8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTrait {
    /// `<file_path>:trait:<ordinal>`
    pub id: String,
    pub trait_type: String,
    /// `None` for bare `@name` annotations.
    pub value: Option<String>,
    /// Text following the annotation on its line.
    pub content: String,
    pub line: usize,
    pub span: TraitSpan,
    pub parent_object_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRef {
    pub source_id: String,
    pub target_raw: String,
    pub display_text: Option<String>,
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    Object,
    Trait,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::Object => "object",
            DateSource::Trait => "trait",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    pub source_type: DateSource,
    pub source_id: String,
    pub field_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedTag {
    /// Lowercased, without `#`.
    pub tag: String,
    pub object_id: String,
    pub line: usize,
}
