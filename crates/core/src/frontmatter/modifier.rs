//! Frontmatter field updates.

use std::collections::BTreeMap;

use serde_yaml::Value;
use thiserror::Error;

use super::parser::{FrontmatterParseError, parse};
use super::serializer::serialize;
use super::types::Frontmatter;

#[derive(Debug, Error)]
pub enum FrontmatterModifyError {
    #[error(transparent)]
    Parse(#[from] FrontmatterParseError),

    #[error("field name must not be empty")]
    EmptyField,
}

/// Set frontmatter fields from string values, creating the block if needed.
///
/// The body is kept byte-for-byte.
pub fn set_fields(
    content: &str,
    updates: &BTreeMap<String, String>,
) -> Result<String, FrontmatterModifyError> {
    let mut doc = parse(content)?;
    let fm = doc.frontmatter.get_or_insert_with(Frontmatter::default);

    for (field, raw) in updates {
        let field = field.trim();
        if field.is_empty() {
            return Err(FrontmatterModifyError::EmptyField);
        }
        fm.fields.insert(field.to_string(), infer_value(raw));
    }

    Ok(serialize(&doc))
}

/// Interpret a CLI/plan string as a YAML scalar.
pub fn infer_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match raw.parse::<i64>() {
            Ok(n) if !raw.starts_with('+') && !(raw.starts_with('0') && raw.len() > 1) => {
                Value::Number(n.into())
            }
            _ => Value::String(raw.to_string()),
        },
    }
}
