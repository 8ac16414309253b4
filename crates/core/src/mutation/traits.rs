//! Bulk trait value updates and single-trait rewrites.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::index::TraitRecord;
use crate::parser::{TraitSpan, find_traits, parse_document};
use crate::schema::{Schema, TraitKind};
use crate::vault::dates::is_valid_date;
use crate::vault::{validate_within_vault, write_atomic};

#[derive(Debug, Error)]
pub enum TraitMutationError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid trait id: {0}")]
    InvalidId(String),

    #[error("trait not found: {0}")]
    NotFound(String),
}

/// A trait occurrence selected for update.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitUpdate {
    pub id: String,
    pub file_path: String,
    /// 1-indexed.
    pub line: usize,
    pub trait_type: String,
    /// Explicit value; `None` for bare annotations.
    pub value: Option<String>,
    /// Where the annotation sat when it was indexed.
    pub span: TraitSpan,
}

impl From<TraitRecord> for TraitUpdate {
    fn from(record: TraitRecord) -> Self {
        Self {
            id: record.id,
            file_path: record.file_path,
            line: record.line,
            trait_type: record.trait_type,
            value: record.value,
            span: record.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitStatus {
    Modified,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitResult {
    pub id: String,
    pub file_path: String,
    pub line: usize,
    pub status: TraitStatus,
    pub old_value: Option<String>,
    pub new_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TraitBulkSummary {
    pub preview: bool,
    pub total: usize,
    pub modified: usize,
    pub skipped: usize,
    pub errors: usize,
    pub results: Vec<TraitResult>,
}

impl TraitBulkSummary {
    fn from_results(preview: bool, results: Vec<TraitResult>) -> Self {
        let count = |s: TraitStatus| results.iter().filter(|r| r.status == s).count();
        Self {
            preview,
            total: results.len(),
            modified: count(TraitStatus::Modified),
            skipped: count(TraitStatus::Skipped),
            errors: count(TraitStatus::Error),
            results,
        }
    }
}

/// Rewrites computed for one file.
struct FilePlan {
    file_path: String,
    updated: Option<String>,
    results: Vec<TraitResult>,
}

/// Compute what an update would do without touching disk.
pub fn preview(
    vault_root: &Path,
    traits: &[TraitUpdate],
    new_value: &str,
    schema: &Schema,
) -> Result<TraitBulkSummary, TraitMutationError> {
    let plans = plan_updates(vault_root, traits, new_value, schema)?;
    let results = plans.into_iter().flat_map(|p| p.results).collect();
    Ok(TraitBulkSummary::from_results(true, results))
}

/// Rewrite every trait not already at `new_value`, one write per file.
///
/// `on_written` is called with the vault-relative path of each file written.
/// When a write fails, every trait of that file is reported as an error.
pub fn apply(
    vault_root: &Path,
    traits: &[TraitUpdate],
    new_value: &str,
    schema: &Schema,
    mut on_written: impl FnMut(&str),
) -> Result<TraitBulkSummary, TraitMutationError> {
    let plans = plan_updates(vault_root, traits, new_value, schema)?;
    let mut results = Vec::new();

    for mut plan in plans {
        if let Some(updated) = plan.updated.as_deref() {
            match write_atomic(&vault_root.join(&plan.file_path), updated.as_bytes()) {
                Ok(()) => on_written(&plan.file_path),
                Err(e) => {
                    tracing::warn!("Failed to write {}: {}", plan.file_path, e);
                    for r in plan.results.iter_mut().filter(|r| r.status == TraitStatus::Modified) {
                        r.status = TraitStatus::Error;
                        r.reason = Some(format!("write failed: {e}"));
                    }
                }
            }
        }
        results.append(&mut plan.results);
    }

    Ok(TraitBulkSummary::from_results(false, results))
}

/// Check a new value against the trait's declared kind.
pub fn validate_value(
    schema: &Schema,
    trait_type: &str,
    new_value: &str,
) -> Result<(), TraitMutationError> {
    if new_value.trim().is_empty() {
        return Err(TraitMutationError::Validation("new value must not be empty".into()));
    }
    if new_value.contains(')') || new_value.contains('\n') {
        return Err(TraitMutationError::Validation(format!(
            "value may not contain ')' or newlines: {new_value}"
        )));
    }
    let Some(def) = schema.traits.get(trait_type) else {
        return Ok(());
    };
    match def.kind {
        TraitKind::Date if !is_valid_date(new_value) => Err(TraitMutationError::Validation(
            format!("@{trait_type} expects a YYYY-MM-DD date, got '{new_value}'"),
        )),
        TraitKind::Boolean if new_value != "true" && new_value != "false" => {
            Err(TraitMutationError::Validation(format!(
                "@{trait_type} expects true or false, got '{new_value}'"
            )))
        }
        TraitKind::Enum if !def.values.is_empty() && !def.values.iter().any(|v| v == new_value) => {
            Err(TraitMutationError::Validation(format!(
                "@{trait_type} expects one of [{}], got '{new_value}'",
                def.values.join(", ")
            )))
        }
        _ => Ok(()),
    }
}

fn plan_updates(
    vault_root: &Path,
    traits: &[TraitUpdate],
    new_value: &str,
    schema: &Schema,
) -> Result<Vec<FilePlan>, TraitMutationError> {
    let new_value = new_value.trim();
    let mut types: Vec<&str> = traits.iter().map(|t| t.trait_type.as_str()).collect();
    types.sort_unstable();
    types.dedup();
    for trait_type in types {
        validate_value(schema, trait_type, new_value)?;
    }

    let mut by_file: BTreeMap<&str, Vec<&TraitUpdate>> = BTreeMap::new();
    for t in traits {
        by_file.entry(t.file_path.as_str()).or_default().push(t);
    }

    let mut plans = Vec::with_capacity(by_file.len());
    for (file_path, updates) in by_file {
        plans.push(plan_file(vault_root, file_path, &updates, new_value, schema));
    }
    Ok(plans)
}

fn plan_file(
    vault_root: &Path,
    file_path: &str,
    updates: &[&TraitUpdate],
    new_value: &str,
    schema: &Schema,
) -> FilePlan {
    let result = |t: &TraitUpdate, status, reason: Option<String>| TraitResult {
        id: t.id.clone(),
        file_path: t.file_path.clone(),
        line: t.line,
        status,
        old_value: schema.effective_trait_value(&t.trait_type, t.value.as_deref()),
        new_value: new_value.to_string(),
        reason,
    };
    let fail_all = |reason: String| FilePlan {
        file_path: file_path.to_string(),
        updated: None,
        results: updates
            .iter()
            .map(|&t| result(t, TraitStatus::Error, Some(reason.clone())))
            .collect(),
    };

    let content = match validate_within_vault(vault_root, Path::new(file_path))
        .map_err(|e| e.to_string())
        .and_then(|rel| {
            std::fs::read_to_string(vault_root.join(rel)).map_err(|e| e.to_string())
        }) {
        Ok(c) => c,
        Err(e) => return fail_all(format!("cannot read file: {e}")),
    };

    let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();
    let mut results = Vec::with_capacity(updates.len());
    // (line index, span start, span end, replacement)
    let mut edits: Vec<(usize, usize, usize, String)> = Vec::new();
    let mut seen = HashSet::new();

    for &t in updates {
        if !seen.insert(t.id.as_str()) {
            results.push(result(t, TraitStatus::Skipped, Some("duplicate".into())));
            continue;
        }
        let current = schema.effective_trait_value(&t.trait_type, t.value.as_deref());
        if current.as_deref() == Some(new_value) {
            results.push(result(t, TraitStatus::Skipped, Some("already set".into())));
            continue;
        }
        let Some(idx) = t.line.checked_sub(1).filter(|&i| i < lines.len()) else {
            results.push(result(t, TraitStatus::Error, Some("line out of range".into())));
            continue;
        };
        if !annotation_at_span(line_body(&lines[idx]), t) {
            results.push(result(
                t,
                TraitStatus::Error,
                Some(format!("@{} no longer at line {} column {}", t.trait_type, t.line, t.span.column())),
            ));
            continue;
        }
        let prefix = t.span.prefix.map(String::from).unwrap_or_default();
        edits.push((idx, t.span.start, t.span.end, format!("{prefix}@{}({new_value})", t.trait_type)));
        results.push(result(t, TraitStatus::Modified, None));
    }

    // Splice right to left so earlier offsets on the same line stay valid
    edits.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
    for (idx, start, end, replacement) in &edits {
        lines[*idx].replace_range(*start..*end, replacement);
    }

    FilePlan {
        file_path: file_path.to_string(),
        updated: (!edits.is_empty()).then(|| lines.concat()),
        results,
    }
}

fn line_body(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Whether the annotation recorded for `t` is still exactly where the index
/// says it is, with the same type and value.
fn annotation_at_span(line: &str, t: &TraitUpdate) -> bool {
    find_traits(line).iter().any(|m| {
        m.start == t.span.start
            && m.end == t.span.end
            && m.prefix == t.span.prefix
            && m.name == t.trait_type
            && m.value == t.value
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Single trait by ID
// ─────────────────────────────────────────────────────────────────────────────

/// Split `<file>:trait:<ordinal>`.
pub fn parse_trait_id(trait_id: &str) -> Result<(String, usize), TraitMutationError> {
    let (file, ordinal) = trait_id
        .split_once(":trait:")
        .ok_or_else(|| TraitMutationError::InvalidId(trait_id.to_string()))?;
    let ordinal = ordinal
        .parse()
        .map_err(|_| TraitMutationError::InvalidId(trait_id.to_string()))?;
    if file.is_empty() {
        return Err(TraitMutationError::InvalidId(trait_id.to_string()));
    }
    Ok((file.replace('\\', "/"), ordinal))
}

/// Rewrite the trait with the given ID in `content`, located through the
/// parser's span for that occurrence.
pub fn rewrite_trait_by_id(
    content: &str,
    rel_path: &str,
    trait_id: &str,
    new_value: &str,
    schema: &Schema,
) -> Result<String, TraitMutationError> {
    let new_value = new_value.trim();
    let doc = parse_document(content, rel_path)
        .map_err(|e| TraitMutationError::Validation(e.to_string()))?;
    let found = doc
        .traits
        .iter()
        .find(|t| t.id == trait_id)
        .ok_or_else(|| TraitMutationError::NotFound(trait_id.to_string()))?;
    validate_value(schema, &found.trait_type, new_value)?;

    let line_start = crate::markdown_ast::comrak::line_start_offset(content, found.span.line);
    let start = line_start + found.span.start;
    let end = line_start + found.span.end;
    if end > content.len() {
        return Err(TraitMutationError::NotFound(trait_id.to_string()));
    }

    let prefix = found.span.prefix.map(String::from).unwrap_or_default();
    let mut out = String::with_capacity(content.len() + new_value.len());
    out.push_str(&content[..start]);
    out.push_str(&format!("{prefix}@{}({new_value})", found.trait_type));
    out.push_str(&content[end..]);
    Ok(out)
}
