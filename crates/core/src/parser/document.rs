//! Whole-file parsing.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::refs::{find_wikilinks, whole_wikilink_target};
use super::tags::{find_tags, normalize_tag};
use super::traits::find_traits;
use super::types::*;
use crate::frontmatter::{self, FrontmatterParseError};
use crate::markdown_ast::MarkdownEditor;
use crate::vault::dates::is_valid_date;
use crate::vault::paths::file_path_to_object_id;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{path}: {source}")]
    Frontmatter {
        path: String,
        #[source]
        source: FrontmatterParseError,
    },

    #[error("not a markdown file: {0}")]
    NotMarkdown(String),
}

/// Parse file content into a [`Document`].
///
/// `rel_path` is the vault-relative path of the file including `.md`.
pub fn parse_document(content: &str, rel_path: &str) -> Result<Document, ParseError> {
    let file_path = rel_path.replace('\\', "/");
    if !file_path.ends_with(".md") {
        return Err(ParseError::NotMarkdown(file_path));
    }
    let file_id = file_path_to_object_id(&file_path);

    let parsed = frontmatter::parse(content).map_err(|source| ParseError::Frontmatter {
        path: file_path.clone(),
        source,
    })?;
    let offset = parsed.frontmatter_lines;
    let total_lines = content.lines().count().max(1);

    let mut doc = Document { file_path: file_path.clone(), ..Default::default() };

    // File object from frontmatter
    let mut fields = BTreeMap::new();
    let mut object_type = DEFAULT_OBJECT_TYPE.to_string();
    let mut alias = None;
    if let Some(fm) = &parsed.frontmatter {
        for (key, value) in &fm.fields {
            if let Ok(json) = serde_json::to_value(value) {
                fields.insert(key.clone(), json);
            }
        }
        if let Some(t) = fm.get_str("type").map(str::trim).filter(|t| !t.is_empty()) {
            object_type = t.to_string();
        }
        alias = fm.get_str("alias").map(str::trim).filter(|a| !a.is_empty()).map(String::from);
    }

    doc.objects.push(ParsedObject {
        id: file_id.clone(),
        object_type,
        heading: None,
        heading_level: None,
        fields,
        line_start: 1,
        line_end: total_lines,
        parent_id: None,
        alias,
    });

    let outline = MarkdownEditor::outline(&parsed.body);
    push_sections(&mut doc, &file_id, &outline.headings, offset, total_lines);

    if let Some(fm) = &parsed.frontmatter {
        extract_frontmatter_links(&mut doc, &file_id, fm, &parsed.field_lines);
    }

    scan_body(&mut doc, &parsed.body, offset, |line| outline.in_code_block(line));

    Ok(doc)
}

fn push_sections(
    doc: &mut Document,
    file_id: &str,
    headings: &[crate::markdown_ast::HeadingInfo],
    offset: usize,
    total_lines: usize,
) {
    let mut slug_counts: HashMap<String, usize> = HashMap::new();
    // (level, id) of enclosing headings
    let mut stack: Vec<(u8, String)> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        let base = slugify(&heading.title);
        let count = slug_counts.entry(base.clone()).or_insert(0);
        *count += 1;
        let slug = if *count == 1 { base } else { format!("{base}-{count}") };
        let id = format!("{file_id}#{slug}");

        while stack.last().is_some_and(|(level, _)| *level >= heading.level) {
            stack.pop();
        }
        let parent_id = stack.last().map_or_else(|| file_id.to_string(), |(_, id)| id.clone());

        let line_start = heading.line + offset;
        let line_end = headings
            .get(i + 1)
            .map_or(total_lines, |next| next.line + offset - 1)
            .max(line_start);

        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), serde_json::Value::String(heading.title.clone()));
        fields.insert("level".to_string(), serde_json::Value::from(heading.level));

        doc.objects.push(ParsedObject {
            id: id.clone(),
            object_type: SECTION_TYPE.to_string(),
            heading: Some(heading.title.clone()),
            heading_level: Some(heading.level),
            fields,
            line_start,
            line_end,
            parent_id: Some(parent_id),
            alias: None,
        });
        stack.push((heading.level, id));
    }
}

fn extract_frontmatter_links(
    doc: &mut Document,
    file_id: &str,
    fm: &frontmatter::Frontmatter,
    field_lines: &HashMap<String, usize>,
) {
    let mut keys: Vec<_> = fm.fields.keys().collect();
    keys.sort();

    for key in keys {
        let line = field_lines.get(key.as_str()).copied().unwrap_or(1);
        let values: Vec<&str> = match &fm.fields[key] {
            serde_yaml::Value::String(s) => vec![s.as_str()],
            serde_yaml::Value::Sequence(seq) => seq.iter().filter_map(|v| v.as_str()).collect(),
            _ => continue,
        };

        for value in values {
            if key == "tags" {
                let tag = normalize_tag(value);
                if !tag.is_empty() {
                    doc.tags.push(ParsedTag { tag, object_id: file_id.to_string(), line });
                }
            } else if let Some(target) = whole_wikilink_target(value) {
                doc.refs.push(ParsedRef {
                    source_id: file_id.to_string(),
                    target_raw: target,
                    display_text: None,
                    line,
                    start: 0,
                    end: 0,
                });
            } else if is_valid_date(value.trim()) {
                doc.dates.push(DateEntry {
                    date: value.trim().to_string(),
                    source_type: DateSource::Object,
                    source_id: file_id.to_string(),
                    field_name: key.clone(),
                });
            }
        }
    }
}

fn scan_body(
    doc: &mut Document,
    body: &str,
    offset: usize,
    in_code: impl Fn(usize) -> bool,
) {
    let mut ordinal = 0;

    for (idx, text) in body.lines().enumerate() {
        let body_line = idx + 1;
        if in_code(body_line) {
            continue;
        }
        let line = body_line + offset;
        let owner = doc
            .object_at_line(line)
            .map(|o| o.id.clone())
            .unwrap_or_default();

        for t in find_traits(text) {
            let id = format!("{}:trait:{}", doc.file_path, ordinal);
            ordinal += 1;
            if let Some(v) = t.value.as_deref().filter(|v| is_valid_date(v)) {
                doc.dates.push(DateEntry {
                    date: v.to_string(),
                    source_type: DateSource::Trait,
                    source_id: id.clone(),
                    field_name: t.name.clone(),
                });
            }
            doc.traits.push(ParsedTrait {
                id,
                trait_type: t.name,
                value: t.value,
                content: t.content,
                line,
                span: TraitSpan { line, start: t.start, end: t.end, prefix: t.prefix },
                parent_object_id: owner.clone(),
            });
        }

        for link in find_wikilinks(text) {
            doc.refs.push(ParsedRef {
                source_id: owner.clone(),
                target_raw: link.target,
                display_text: link.display,
                line,
                start: link.start,
                end: link.end,
            });
        }

        for tag in find_tags(text) {
            doc.tags.push(ParsedTag { tag, object_id: owner.clone(), line });
        }
    }
}

/// Heading slug: lowercase alphanumerics joined by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    if slug.is_empty() { "section".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DAILY: &str = "---\ntype: date\n---\n# Saturday\n\n- @task(todo) call [[people/freya]]\n\n## Notes\n\nRead #books\n\n```\n@task not real\n```\n\n## Notes\n- @done\n";

    #[test]
    fn file_object_defaults_to_page() {
        let doc = parse_document("hello\n", "inbox/idea.md").unwrap();
        let obj = doc.file_object().unwrap();
        assert_eq!(obj.id, "inbox/idea");
        assert_eq!(obj.object_type, "page");
        assert_eq!((obj.line_start, obj.line_end), (1, 1));
    }

    #[test]
    fn sections_get_line_ranges_and_unique_slugs() {
        let doc = parse_document(DAILY, "daily/2026-02-14.md").unwrap();
        let ids: Vec<_> = doc.objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "daily/2026-02-14",
                "daily/2026-02-14#saturday",
                "daily/2026-02-14#notes",
                "daily/2026-02-14#notes-2",
            ]
        );
        let saturday = &doc.objects[1];
        assert_eq!((saturday.line_start, saturday.line_end), (4, 7));
        assert_eq!(doc.objects[2].parent_id.as_deref(), Some("daily/2026-02-14#saturday"));
        assert_eq!(doc.objects[3].line_end, 17);
    }

    #[test]
    fn traits_skip_code_and_carry_spans() {
        let doc = parse_document(DAILY, "daily/2026-02-14.md").unwrap();
        assert_eq!(doc.traits.len(), 2);

        let first = &doc.traits[0];
        assert_eq!(first.id, "daily/2026-02-14.md:trait:0");
        assert_eq!(first.trait_type, "task");
        assert_eq!(first.value.as_deref(), Some("todo"));
        assert_eq!(first.line, 6);
        assert_eq!(first.span.prefix, Some(' '));
        assert_eq!(first.span.column(), 2);
        assert_eq!(first.parent_object_id, "daily/2026-02-14#saturday");

        let second = &doc.traits[1];
        assert_eq!(second.id, "daily/2026-02-14.md:trait:1");
        assert_eq!(second.value, None);
        assert_eq!(second.parent_object_id, "daily/2026-02-14#notes-2");
    }

    #[test]
    fn refs_tags_and_dates() {
        let content = "---\ntype: book\nauthor: \"[[people/frank]]\"\nfinished: 2026-01-03\ntags: [scifi]\n---\nSee [[books/children|Children]] #classic\n- @due(2026-02-01)\n";
        let doc = parse_document(content, "books/dune.md").unwrap();

        let targets: Vec<_> = doc.refs.iter().map(|r| (r.target_raw.as_str(), r.line)).collect();
        assert_eq!(targets, [("people/frank", 3), ("books/children", 7)]);
        assert_eq!(doc.refs[1].display_text.as_deref(), Some("Children"));

        let tags: Vec<_> = doc.tags.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, ["scifi", "classic"]);

        let dates: Vec<_> =
            doc.dates.iter().map(|d| (d.date.as_str(), d.source_type, d.field_name.as_str())).collect();
        assert_eq!(
            dates,
            [
                ("2026-01-03", DateSource::Object, "finished"),
                ("2026-02-01", DateSource::Trait, "due"),
            ]
        );
    }

    #[test]
    fn alias_is_read_from_frontmatter() {
        let doc = parse_document("---\ntype: person\nname: Freya\nalias: The Queen\n---\n", "people/freya.md")
            .unwrap();
        let obj = doc.file_object().unwrap();
        assert_eq!(obj.object_type, "person");
        assert_eq!(obj.alias.as_deref(), Some("The Queen"));
        assert_eq!(obj.fields["name"], serde_json::json!("Freya"));
    }

    #[test]
    fn invalid_frontmatter_is_reported() {
        let err = parse_document("---\na: [\n---\n", "bad.md").unwrap_err();
        assert!(matches!(err, ParseError::Frontmatter { .. }));
    }

    #[rstest]
    #[case("Weekly Review", "weekly-review")]
    #[case("  Q3 -- plans & goals ", "q3-plans-goals")]
    #[case("snake_case_heading", "snake-case-heading")]
    #[case("???", "section")]
    fn slugs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }
}
