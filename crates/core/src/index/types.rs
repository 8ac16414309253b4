//! Records returned by index queries.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::parser::TraitSpan;

/// An indexed object (file or section).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// An indexed trait occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitRecord {
    pub id: String,
    pub trait_type: String,
    /// Explicit value; `None` for bare annotations.
    pub value: Option<String>,
    /// Explicit value or the schema default at index time.
    pub effective_value: Option<String>,
    pub content: String,
    pub file_path: String,
    pub line: usize,
    pub parent_object_id: String,
    #[serde(skip)]
    pub span: TraitSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefRecord {
    pub source_id: String,
    pub target_id: Option<String>,
    pub target_raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    pub file_path: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateHit {
    pub date: String,
    pub source_type: String,
    pub source_id: String,
    pub field_name: String,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagHit {
    pub tag: String,
    pub object_id: String,
    pub file_path: String,
    pub line: usize,
}

/// Row counts of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub file_count: usize,
    pub object_count: usize,
    pub trait_count: usize,
    pub ref_count: usize,
}

/// Outcome of the reference-resolution sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefResolution {
    pub resolved: usize,
    /// Includes ambiguous references.
    pub unresolved: usize,
    pub ambiguous: usize,
    pub total: usize,
}
