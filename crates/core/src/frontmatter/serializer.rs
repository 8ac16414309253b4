//! Frontmatter serialization back to markdown.

use super::types::ParsedDocument;
use serde_yaml::Value;
use std::collections::HashMap;

/// Serialize a parsed document back to markdown, keeping the body verbatim.
pub fn serialize(doc: &ParsedDocument) -> String {
    if let Some(fm) = &doc.frontmatter
        && !fm.fields.is_empty()
    {
        let yaml = serialize_frontmatter(&fm.fields);
        return format!("---\n{}---\n{}", yaml, doc.body);
    }
    doc.body.clone()
}

/// Serialize frontmatter fields to YAML, `type` first then alphabetical.
fn serialize_frontmatter(fields: &HashMap<String, Value>) -> String {
    let mut mapping = serde_yaml::Mapping::new();

    if let Some(value) = fields.get("type") {
        mapping.insert(Value::String("type".to_string()), value.clone());
    }

    let mut remaining: Vec<_> = fields.keys().filter(|k| k.as_str() != "type").collect();
    remaining.sort();

    for key in remaining {
        if let Some(value) = fields.get(key) {
            mapping.insert(Value::String(key.clone()), value.clone());
        }
    }

    serde_yaml::to_string(&mapping).unwrap_or_default()
}
