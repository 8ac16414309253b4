use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, parse_document};

use crate::markdown_ast::types::*;

/// Build the heading and code-block outline of a markdown body.
///
/// Line numbers are relative to `input`; callers add any frontmatter offset.
pub fn outline(input: &str) -> Outline {
    let arena = Arena::new();
    let options = default_options();
    let root = parse_document(&arena, input, &options);

    let mut out = Outline::default();

    for node in root.descendants() {
        let data = node.data.borrow();
        match data.value {
            NodeValue::Heading(ref heading) => {
                out.headings.push(HeadingInfo {
                    title: collect_text(node),
                    level: heading.level,
                    line: data.sourcepos.start.line,
                });
            }
            NodeValue::CodeBlock(_) => {
                out.code_blocks.push(data.sourcepos.start.line..=data.sourcepos.end.line);
            }
            _ => {}
        }
    }

    out
}

/// Insert a fragment at the end of the matching section.
/// Uses string-based insertion to preserve original formatting (including wikilinks).
pub fn append_to_section(
    input: &str,
    section: &SectionMatch,
    fragment: &str,
) -> Result<InsertResult, MarkdownAstError> {
    if input.trim().is_empty() {
        return Err(MarkdownAstError::EmptyDocument);
    }

    let headings = outline(input).headings;
    let idx = headings
        .iter()
        .position(|h| matches_heading(h, section))
        .ok_or_else(|| MarkdownAstError::SectionNotFound(section.title.clone()))?;
    let heading = headings[idx].clone();

    let content_start = line_end_offset(input, heading.line);
    let content_end = headings[idx + 1..]
        .iter()
        .find(|h| h.level <= heading.level)
        .map_or(input.len(), |next| line_start_offset(input, next.line));

    // Insert before trailing blank lines so section separators survive
    let section_content = &input[content_start..content_end];
    let insert_point = content_start + find_content_end_before_blanks(section_content);

    let mut result = String::with_capacity(input.len() + fragment.len() + 2);
    result.push_str(&input[..insert_point]);
    if insert_point > 0 && !result.ends_with('\n') {
        result.push('\n');
    }
    result.push_str(fragment);
    if !fragment.ends_with('\n') {
        result.push('\n');
    }
    result.push_str(&input[insert_point..]);

    Ok(InsertResult { content: result, matched_heading: heading })
}

/// Byte offset at the end of a 1-indexed line (after its newline if present)
pub fn line_end_offset(input: &str, line_num: usize) -> usize {
    let mut current_line = 1;
    for (i, b) in input.bytes().enumerate() {
        if b == b'\n' {
            if current_line == line_num {
                return i + 1;
            }
            current_line += 1;
        }
    }
    input.len()
}

/// Byte offset at the start of a 1-indexed line
pub fn line_start_offset(input: &str, line_num: usize) -> usize {
    if line_num <= 1 {
        return 0;
    }
    let mut current_line = 1;
    for (i, b) in input.bytes().enumerate() {
        if b == b'\n' {
            current_line += 1;
            if current_line == line_num {
                return i + 1;
            }
        }
    }
    input.len()
}

/// End of actual content, before any trailing blank lines.
/// Returns a byte offset relative to the start of `content`.
fn find_content_end_before_blanks(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut end = bytes.len();

    while end > 0 && matches!(bytes[end - 1], b'\n' | b' ' | b'\t' | b'\r') {
        end -= 1;
    }

    if end < bytes.len()
        && let Some(newline_offset) = bytes[end..].iter().position(|&b| b == b'\n')
    {
        return end + newline_offset + 1;
    }

    end
}

// --- Internal helpers ---

fn default_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    // Frontmatter is stripped before parsing; keep smart punctuation off
    options.parse.smart = false;
    options
}

pub(crate) fn matches_heading(heading: &HeadingInfo, section: &SectionMatch) -> bool {
    if section.level.is_some_and(|l| l != heading.level) {
        return false;
    }
    let h = heading.title.trim();
    let s = section.title.trim();
    if section.case_sensitive { h == s } else { h.eq_ignore_ascii_case(s) }
}

fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for child in node.descendants() {
        match child.data.borrow().value {
            NodeValue::Text(ref t) => text.push_str(t),
            NodeValue::Code(ref c) => text.push_str(&c.literal),
            _ => {}
        }
    }
    text
}
