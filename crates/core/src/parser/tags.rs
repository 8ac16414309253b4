//! Inline `#tag` tokens.

use std::sync::LazyLock;

use regex::Regex;

use super::inline::{code_spans, in_spans};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    // a tag starts with a letter and must follow whitespace or start the line
    Regex::new(r"(?:^|\s)#([A-Za-z][\w/\-]*)").unwrap()
});

/// Lowercased tags on a line, ignoring inline code.
pub fn find_tags(line: &str) -> Vec<String> {
    let spans = code_spans(line);
    TAG_RE
        .captures_iter(line)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            if in_spans(&spans, m.start()) {
                return None;
            }
            Some(m.as_str().trim_end_matches(['/', '-']).to_lowercase())
        })
        .collect()
}

/// Normalize a tag given in frontmatter or on the command line.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}
