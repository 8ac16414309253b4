//! Appending capture lines to notes.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::MutationContext;
use crate::frontmatter;
use crate::index::IndexError;
use crate::markdown_ast::{MarkdownEditor, SectionMatch};
use crate::markdown_ast::comrak::line_end_offset;
use crate::parser::{ParseError, parse_document};
use crate::resolver::ResolveError;
use crate::vault::dates::{daily_note_template, parse_iso_date};
use crate::vault::{AtomicWriteError, PathError, validate_within_vault, write_atomic};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture text must not be empty")]
    EmptyText,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("target is protected: {0}")]
    Protected(String),

    #[error("target does not exist and is not a daily note: {0}")]
    MissingTarget(String),

    #[error("section not found: {0}")]
    SectionNotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] AtomicWriteError),
}

/// A computed capture, not yet written.
#[derive(Debug, Clone, Serialize)]
pub struct CapturePlan {
    /// Vault-relative target file.
    pub file_path: String,
    pub object_id: String,
    /// The target is a daily note that will be created.
    pub created: bool,
    pub line: String,
    #[serde(skip)]
    pub content: String,
}

/// Resolve the target and compute the new file content.
///
/// Missing targets are created only when they are daily notes. With a
/// heading the line goes to the end of that section, which is added at the end
/// of the file when absent. A section target receives the line at the end of
/// its range.
pub fn plan_capture(
    ctx: &MutationContext<'_>,
    reference: &str,
    text: &str,
    heading: Option<&str>,
) -> Result<CapturePlan, CaptureError> {
    plan_capture_with(ctx, reference, text, heading, |rel| read_existing(ctx.vault_root, rel))
}

/// [`plan_capture`] with the target's current content supplied by `load`,
/// which returns `None` for a file that does not exist.
pub fn plan_capture_with(
    ctx: &MutationContext<'_>,
    reference: &str,
    text: &str,
    heading: Option<&str>,
    load: impl FnOnce(&str) -> Result<Option<String>, CaptureError>,
) -> Result<CapturePlan, CaptureError> {
    let text = text.trim_end();
    if text.trim().is_empty() {
        return Err(CaptureError::EmptyText);
    }

    let target = ctx.resolver(true)?.resolve(reference).into_unique(reference)?;
    let rel = validate_within_vault(ctx.vault_root, Path::new(&target.file_path))?;
    if ctx.is_protected(&rel) {
        return Err(CaptureError::Protected(target.target_id));
    }

    let (existing, created) = if let Some(content) = load(&rel)? {
        (content, false)
    } else if ctx.config.is_daily_object_id(&target.file_object_id) {
        let date = target
            .file_object_id
            .rsplit('/')
            .next()
            .and_then(parse_iso_date)
            .ok_or_else(|| CaptureError::MissingTarget(target.file_object_id.clone()))?;
        (daily_note_template(date), true)
    } else {
        return Err(CaptureError::MissingTarget(target.file_object_id));
    };

    let line = format_capture_line(text);
    let content = if target.is_section {
        let doc = parse_document(&existing, &rel)?;
        let section = doc
            .objects
            .iter()
            .find(|o| o.id == target.target_id)
            .ok_or_else(|| CaptureError::SectionNotFound(target.target_id.clone()))?;
        insert_in_range(&existing, section.line_start, section.line_end, &line)
    } else if let Some(heading) = heading.map(str::trim).filter(|h| !h.is_empty()) {
        insert_under_heading(&existing, heading, &line)
    } else {
        append_line(&existing, &line)
    };

    Ok(CapturePlan { file_path: rel, object_id: target.target_id, created, line, content })
}

/// Plan, write and reindex.
pub fn capture(
    ctx: &MutationContext<'_>,
    reference: &str,
    text: &str,
    heading: Option<&str>,
) -> Result<CapturePlan, CaptureError> {
    let plan = plan_capture(ctx, reference, text, heading)?;
    write_atomic(&ctx.vault_root.join(&plan.file_path), plan.content.as_bytes())?;
    tracing::debug!("Captured to {}", plan.file_path);
    ctx.reindex(std::slice::from_ref(&plan.file_path));
    Ok(plan)
}

/// Content of a vault file, or `None` when it does not exist.
pub fn read_existing(vault_root: &Path, rel: &str) -> Result<Option<String>, CaptureError> {
    let abs = vault_root.join(rel);
    if !abs.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(&abs)
        .map(Some)
        .map_err(|source| CaptureError::Io { path: abs, source })
}

pub fn format_capture_line(text: &str) -> String {
    format!("- {text}")
}

fn append_line(content: &str, line: &str) -> String {
    let mut out = String::with_capacity(content.len() + line.len() + 2);
    out.push_str(content);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out
}

fn insert_under_heading(content: &str, heading: &str, line: &str) -> String {
    // Headings are located in the body only; a frontmatter block would read
    // as a setext heading.
    let body_len = frontmatter::parse(content).map_or(content.len(), |d| d.body.len());
    let (head, body) = content.split_at(content.len() - body_len);

    let section = SectionMatch::from_heading_line(heading);
    match MarkdownEditor::append_to_section(body, &section, line) {
        Ok(result) => format!("{head}{}", result.content),
        Err(_) => {
            let mut out = content.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            if !out.is_empty() && !out.ends_with("\n\n") {
                out.push('\n');
            }
            // A bare title becomes a level-2 heading
            if heading.starts_with('#') {
                out.push_str(heading);
            } else {
                out.push_str("## ");
                out.push_str(heading);
            }
            out.push('\n');
            append_line(&out, line)
        }
    }
}

/// Insert after the last non-blank line within `line_start..=line_end`.
fn insert_in_range(content: &str, line_start: usize, line_end: usize, line: &str) -> String {
    let last_content_line = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(n, l)| *n >= line_start && *n <= line_end && !l.trim().is_empty())
        .map(|(n, _)| n)
        .last()
        .unwrap_or(line_start);

    let offset = line_end_offset(content, last_content_line);
    let mut out = String::with_capacity(content.len() + line.len() + 2);
    out.push_str(&content[..offset]);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out.push_str(&content[offset..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::index::{IndexDb, ReindexOptions, Reindexer};
    use crate::schema::Schema;
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        db: IndexDb,
        config: VaultConfig,
        schema: Schema,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            for (path, content) in files {
                let abs = dir.path().join(path);
                fs::create_dir_all(abs.parent().unwrap()).unwrap();
                fs::write(abs, content).unwrap();
            }
            let db = IndexDb::open_in_memory().unwrap();
            let config = VaultConfig::default();
            let schema = Schema::default();
            Reindexer::new(&db, dir.path(), &config, &schema)
                .run(&ReindexOptions::default())
                .unwrap();
            Self { dir, db, config, schema }
        }

        fn ctx(&self) -> MutationContext<'_> {
            MutationContext {
                db: &self.db,
                vault_root: self.dir.path(),
                config: &self.config,
                schema: &self.schema,
                today: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            }
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.dir.path().join(rel)).unwrap()
        }
    }

    #[test]
    fn appends_to_end_of_file() {
        let fx = Fixture::new(&[("inbox.md", "# Inbox\n\n- first")]);
        capture(&fx.ctx(), "inbox", "second", None).unwrap();
        assert_snapshot!(fx.read("inbox.md"), @r"
        # Inbox

        - first
        - second
        ");
    }

    #[test]
    fn creates_missing_daily_note_from_template() {
        let fx = Fixture::new(&[]);
        let plan = capture(&fx.ctx(), "today", "call mum", None).unwrap();

        assert!(plan.created);
        assert_eq!(plan.file_path, "daily/2026-02-14.md");
        assert_snapshot!(fx.read("daily/2026-02-14.md"), @r"
        ---
        type: date
        ---

        # Saturday, February 14, 2026

        - call mum
        ");
        assert!(fx.db.get_object("daily/2026-02-14").unwrap().is_some());
    }

    #[test]
    fn refuses_to_create_non_daily_targets() {
        let fx = Fixture::new(&[]);
        let err = plan_capture(&fx.ctx(), "projects/new", "x", None).unwrap_err();
        assert!(matches!(err, CaptureError::Resolve(ResolveError::NotFound(_))));
    }

    #[test]
    fn inserts_under_existing_heading() {
        let fx = Fixture::new(&[(
            "inbox.md",
            "---\ntype: inbox\n---\n# Inbox\n\n## Captured\n\n- old\n\n## Later\n\n- someday\n",
        )]);
        capture(&fx.ctx(), "inbox", "new", Some("## Captured")).unwrap();
        assert_snapshot!(fx.read("inbox.md"), @r"
        ---
        type: inbox
        ---
        # Inbox

        ## Captured

        - old
        - new

        ## Later

        - someday
        ");
    }

    #[test]
    fn adds_missing_heading_at_end() {
        let fx = Fixture::new(&[("inbox.md", "# Inbox\n\nText\n")]);
        capture(&fx.ctx(), "inbox", "new", Some("## Captured")).unwrap();
        assert_snapshot!(fx.read("inbox.md"), @r"
        # Inbox

        Text

        ## Captured
        - new
        ");
    }

    #[test]
    fn bare_heading_title_is_created_as_level_two() {
        let fx = Fixture::new(&[("inbox.md", "# Inbox\n")]);
        capture(&fx.ctx(), "inbox", "first", Some("Notes")).unwrap();
        capture(&fx.ctx(), "inbox", "second", Some("Notes")).unwrap();
        assert_snapshot!(fx.read("inbox.md"), @r"
        # Inbox

        ## Notes
        - first
        - second
        ");
    }

    #[test]
    fn section_target_appends_at_section_end() {
        let fx = Fixture::new(&[("notes/plan.md", "# Plan\n\n## Todo\n\n- a\n\n## Done\n\n- b\n")]);
        capture(&fx.ctx(), "plan#todo", "c", None).unwrap();
        assert_snapshot!(fx.read("notes/plan.md"), @r"
        # Plan

        ## Todo

        - a
        - c

        ## Done

        - b
        ");
    }

    #[test]
    fn protected_targets_are_rejected() {
        let mut fx = Fixture::new(&[("archive/old.md", "old\n")]);
        fx.config.protected_prefixes = vec!["archive/".to_string()];
        let err = plan_capture(&fx.ctx(), "archive/old", "x", None).unwrap_err();
        assert!(matches!(err, CaptureError::Protected(_)));
        assert_eq!(fx.read("archive/old.md"), "old\n");
    }

    #[test]
    fn empty_text_is_rejected() {
        let fx = Fixture::new(&[("inbox.md", "x\n")]);
        assert!(matches!(plan_capture(&fx.ctx(), "inbox", "  ", None), Err(CaptureError::EmptyText)));
    }
}
