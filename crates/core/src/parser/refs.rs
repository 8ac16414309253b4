//! Wikilink references.

use std::sync::LazyLock;

use regex::Regex;

use super::inline::{code_spans, in_spans};

static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    // [[target]], [[target|display]], [[target#section|display]]
    Regex::new(r"\[\[([^\]\[|]+)(?:\|([^\]]+))?\]\]").unwrap()
});

/// A wikilink found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub display: Option<String>,
    /// Byte range of `[[...]]` within the line.
    pub start: usize,
    pub end: usize,
}

/// Find wikilinks on a line, ignoring inline code.
pub fn find_wikilinks(line: &str) -> Vec<WikiLink> {
    let spans = code_spans(line);
    WIKILINK_RE
        .captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if in_spans(&spans, whole.start()) {
                return None;
            }
            let target = caps.get(1)?.as_str().trim();
            if target.is_empty() {
                return None;
            }
            Some(WikiLink {
                target: target.to_string(),
                display: caps.get(2).map(|m| m.as_str().trim().to_string()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Target of a value that is exactly one wikilink, e.g. `"[[people/freya]]"`.
pub fn whole_wikilink_target(value: &str) -> Option<String> {
    let value = value.trim();
    let links = find_wikilinks(value);
    match links.as_slice() {
        [link] if link.start == 0 && link.end == value.len() => Some(link.target.clone()),
        _ => None,
    }
}

/// Rewrite wikilinks pointing at `old_id` (or `old_id#...`) to `new_id`,
/// keeping fragments and display text. Returns the new text and the number of
/// links changed.
pub fn rewrite_wikilinks(content: &str, old_id: &str, new_id: &str) -> (String, usize) {
    let mut changed = 0;
    let out = WIKILINK_RE.replace_all(content, |caps: &regex::Captures| {
        let whole = &caps[0];
        let raw = &caps[1];
        let target = raw.trim();
        let (base, fragment) = match target.split_once('#') {
            Some((b, f)) => (b, Some(f)),
            None => (target, None),
        };
        let base_id = base.strip_suffix(".md").unwrap_or(base);
        if base_id != old_id {
            return whole.to_string();
        }
        changed += 1;
        let mut link = format!("[[{new_id}");
        if let Some(f) = fragment {
            link.push('#');
            link.push_str(f);
        }
        if let Some(display) = caps.get(2) {
            link.push('|');
            link.push_str(display.as_str());
        }
        link.push_str("]]");
        link
    });
    (out.into_owned(), changed)
}
