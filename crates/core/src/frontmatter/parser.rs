//! Frontmatter parsing from markdown documents.

use std::collections::HashMap;

use super::types::{Frontmatter, ParsedDocument};
use thiserror::Error;

/// Errors that can occur during frontmatter parsing.
#[derive(Debug, Error)]
pub enum FrontmatterParseError {
    #[error("invalid YAML frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Parse frontmatter from markdown content.
///
/// Frontmatter is delimited by `---` on the first line of the document:
/// ```markdown
/// ---
/// key: value
/// ---
/// # Document content
/// ```
pub fn parse(content: &str) -> Result<ParsedDocument, FrontmatterParseError> {
    let content_no_bom = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(first_line) = content_no_bom.lines().next() else {
        return Ok(no_frontmatter(content));
    };
    if first_line.trim_end() != "---" {
        return Ok(no_frontmatter(content));
    }

    // Skip the opening delimiter line
    let after_first = &content_no_bom[first_line.len()..];
    let after_newline = after_first
        .strip_prefix('\n')
        .or_else(|| after_first.strip_prefix("\r\n"))
        .unwrap_or(after_first);

    let Some((end_pos, yaml_lines)) = find_closing_delimiter(after_newline) else {
        // No closing ---, treat as no frontmatter
        return Ok(no_frontmatter(content));
    };

    let yaml_content = &after_newline[..end_pos];

    // Skip the closing delimiter line
    let after_closing = &after_newline[end_pos..];
    let closing_len = after_closing.find('\n').map_or(after_closing.len(), |i| i + 1);
    let body = after_closing[closing_len..].to_string();

    let frontmatter: Frontmatter = if yaml_content.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml_content)?
    };

    Ok(ParsedDocument {
        frontmatter: Some(frontmatter),
        body,
        frontmatter_lines: yaml_lines + 2,
        field_lines: top_level_key_lines(yaml_content),
    })
}

fn no_frontmatter(content: &str) -> ParsedDocument {
    ParsedDocument {
        frontmatter: None,
        body: content.to_string(),
        frontmatter_lines: 0,
        field_lines: HashMap::new(),
    }
}

/// Byte position of the closing `---` and the number of YAML lines before it.
fn find_closing_delimiter(content: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    for (i, line) in content.split_inclusive('\n').enumerate() {
        if line.trim() == "---" {
            return Some((pos, i));
        }
        pos += line.len();
    }
    None
}

/// Map each unindented `key:` line to its 1-indexed document line.
fn top_level_key_lines(yaml: &str) -> HashMap<String, usize> {
    let mut out = HashMap::new();
    for (i, line) in yaml.lines().enumerate() {
        if line.starts_with([' ', '\t', '-', '#']) {
            continue;
        }
        if let Some((key, _)) = line.split_once(':') {
            let key = key.trim().trim_matches(|c| c == '"' || c == '\'');
            if !key.is_empty() {
                // +2: opening delimiter plus 1-indexing
                out.entry(key.to_string()).or_insert(i + 2);
            }
        }
    }
    out
}
