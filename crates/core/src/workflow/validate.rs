//! Per-op checks and the file changes each op would make.
//!
//! Ops are prepared in plan order against a [`Staged`] view holding the
//! contents earlier ops produced. Apply commits exactly those contents.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::plan::{AddArgs, EditArgs, MoveArgs, Op, OpArgs, SetArgs, UpdateTraitArgs};
use super::plan::scalar_to_string;
use super::types::{Decision, OpSummary};
use crate::frontmatter::set_fields;
use crate::mutation::traits::{parse_trait_id, rewrite_trait_by_id};
use crate::mutation::capture::read_existing;
use crate::mutation::{MutationContext, plan_capture_with};
use crate::parser::refs::rewrite_wikilinks;
use crate::vault::paths::{file_path_to_object_id, validate_within_vault};

/// A fully computed op, ready to commit.
#[derive(Debug, Clone)]
pub(crate) enum Prepared {
    Write { file_path: String, content: String },
    Move(MovePlan),
}

#[derive(Debug, Clone)]
pub(crate) struct MovePlan {
    pub source_path: String,
    pub dest_path: String,
    /// Content for the moved file; differs from the source when it links to itself.
    pub dest_content: String,
    /// Other files whose links were rewritten.
    pub rewrites: Vec<(String, String)>,
}

impl Prepared {
    /// Vault-relative files this op writes.
    pub fn touched(&self) -> Vec<String> {
        match self {
            Self::Write { file_path, .. } => vec![file_path.clone()],
            Self::Move(plan) => std::iter::once(plan.dest_path.clone())
                .chain(plan.rewrites.iter().map(|(p, _)| p.clone()))
                .collect(),
        }
    }
}

/// Vault files as earlier ops of a plan leave them. `None` marks a file
/// moved away.
#[derive(Debug, Default)]
pub(crate) struct Staged {
    files: BTreeMap<String, Option<String>>,
}

impl Staged {
    fn read(&self, ctx: &MutationContext<'_>, rel: &str) -> Result<String, String> {
        match self.files.get(rel) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(format!("cannot read {rel}: moved by an earlier op")),
            None => read(ctx, rel),
        }
    }

    fn exists(&self, ctx: &MutationContext<'_>, rel: &str) -> bool {
        match self.files.get(rel) {
            Some(staged) => staged.is_some(),
            None => ctx.vault_root.join(rel).exists(),
        }
    }

    /// Fold an op's changes into the view.
    pub fn record(&mut self, prepared: &Prepared) {
        match prepared {
            Prepared::Write { file_path, content } => {
                self.files.insert(file_path.clone(), Some(content.clone()));
            }
            Prepared::Move(plan) => {
                self.files.insert(plan.source_path.clone(), None);
                self.files.insert(plan.dest_path.clone(), Some(plan.dest_content.clone()));
                for (file, content) in &plan.rewrites {
                    self.files.insert(file.clone(), Some(content.clone()));
                }
            }
        }
    }
}

/// Decide whether one op may run against the current vault.
pub fn validate_op(ctx: &MutationContext<'_>, index: usize, op: &Op) -> Decision {
    match prepare(ctx, &Staged::default(), op) {
        Ok((summary, _)) => Decision::Allow(OpSummary {
            index,
            op: op.op.clone(),
            why: op.why.clone(),
            summary,
        }),
        Err(reason) => Decision::Reject(reason),
    }
}

pub(crate) fn prepare(
    ctx: &MutationContext<'_>,
    staged: &Staged,
    op: &Op,
) -> Result<(String, Prepared), String> {
    match op.parse_args()? {
        OpArgs::Add(args) => prepare_add(ctx, staged, &args),
        OpArgs::Edit(args) => prepare_edit(ctx, staged, &args),
        OpArgs::Set(args) => prepare_set(ctx, staged, &args),
        OpArgs::Move(args) => prepare_move(ctx, staged, &args),
        OpArgs::UpdateTrait(args) => prepare_update_trait(ctx, staged, &args),
    }
}

fn prepare_add(
    ctx: &MutationContext<'_>,
    staged: &Staged,
    args: &AddArgs,
) -> Result<(String, Prepared), String> {
    if args.to.trim().is_empty() || args.text.trim().is_empty() {
        return Err("add requires to and text".into());
    }
    let heading = args.heading.as_deref().map(str::trim).filter(|h| !h.is_empty());
    let plan = plan_capture_with(ctx, &args.to, &args.text, heading, |rel| {
        match staged.files.get(rel) {
            Some(content) => Ok(content.clone()),
            None => read_existing(ctx.vault_root, rel),
        }
    })
    .map_err(|e| e.to_string())?;

    let mut summary = format!("append to {}", plan.object_id);
    if let Some(h) = heading {
        summary.push_str(&format!(" under heading \"{h}\""));
    }
    if plan.created {
        summary.push_str(" (creates daily note)");
    }
    Ok((summary, Prepared::Write { file_path: plan.file_path, content: plan.content }))
}

fn prepare_edit(
    ctx: &MutationContext<'_>,
    staged: &Staged,
    args: &EditArgs,
) -> Result<(String, Prepared), String> {
    if args.path.trim().is_empty() || args.old_str.is_empty() {
        return Err("edit requires path and old_str".into());
    }
    let rel = within_vault(ctx, args.path.trim())?;
    if ctx.is_protected(&rel) {
        return Err(format!("path is protected: {rel}"));
    }
    let content = staged.read(ctx, &rel)?;

    let matches = content.matches(args.old_str.as_str()).count();
    if matches != 1 {
        return Err(format!("old_str must match exactly once (matches={matches})"));
    }
    let content = content.replacen(args.old_str.as_str(), &args.new_str, 1);
    Ok((format!("edit {rel} (1 replacement)"), Prepared::Write { file_path: rel, content }))
}

fn prepare_set(
    ctx: &MutationContext<'_>,
    staged: &Staged,
    args: &SetArgs,
) -> Result<(String, Prepared), String> {
    if args.object_id.trim().is_empty() || args.fields.is_empty() {
        return Err("set requires object_id and fields".into());
    }
    let mut fields = BTreeMap::new();
    for (key, value) in &args.fields {
        let value = scalar_to_string(value)
            .ok_or_else(|| format!("field {key} must be a string, number or boolean"))?;
        fields.insert(key.clone(), value);
    }

    let target = ctx
        .resolver(false)
        .map_err(|e| e.to_string())?
        .resolve(&args.object_id)
        .into_unique(&args.object_id)
        .map_err(|e| e.to_string())?;
    if target.is_section {
        return Err(format!("cannot set fields on a section: {}", target.target_id));
    }
    let rel = within_vault(ctx, &target.file_path)?;
    if ctx.is_protected(&rel) {
        return Err(format!("target is protected: {}", target.target_id));
    }

    let content = set_fields(&staged.read(ctx, &rel)?, &fields).map_err(|e| e.to_string())?;
    Ok((
        format!("set {} field(s) on {}", fields.len(), target.target_id),
        Prepared::Write { file_path: rel, content },
    ))
}

fn prepare_move(
    ctx: &MutationContext<'_>,
    staged: &Staged,
    args: &MoveArgs,
) -> Result<(String, Prepared), String> {
    if args.source.trim().is_empty() || args.destination.trim().is_empty() {
        return Err("move requires source and destination".into());
    }
    let source = ctx
        .resolver(false)
        .map_err(|e| e.to_string())?
        .resolve(&args.source)
        .into_unique(&args.source)
        .map_err(|e| e.to_string())?;
    if source.is_section {
        return Err(format!("cannot move a section: {}", source.target_id));
    }
    let source_path = within_vault(ctx, &source.file_path)?;
    if ctx.is_protected(&source_path) {
        return Err(format!("source is protected: {source_path}"));
    }

    let dest_path = within_vault(ctx, &destination_path(&args.destination))?;
    if ctx.is_protected(&dest_path) {
        return Err(format!("destination is protected: {dest_path}"));
    }
    if dest_path == source_path {
        return Err("source and destination are the same".into());
    }
    if staged.exists(ctx, &dest_path) {
        return Err(format!("destination already exists: {dest_path}"));
    }

    let source_id = source.file_object_id;
    let dest_id = file_path_to_object_id(&dest_path);
    let mut dest_content = staged.read(ctx, &source_path)?;
    let mut rewrites = Vec::new();

    if args.update_refs.unwrap_or(true) {
        let mut raw_by_file: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for r in ctx.db.backlinks(&source_id).map_err(|e| e.to_string())? {
            let base = r.target_raw.split('#').next().unwrap_or_default().trim();
            let base = base.strip_suffix(".md").unwrap_or(base).to_string();
            if !base.is_empty() {
                raw_by_file.entry(r.file_path).or_default().insert(base);
            }
        }

        for (file, raws) in raw_by_file {
            if file == source_path {
                dest_content = rewrite_all(&dest_content, &raws, &dest_id).0;
                continue;
            }
            if ctx.is_protected(&file) {
                tracing::warn!("Not rewriting links in protected file {}", file);
                continue;
            }
            let (content, changed) = rewrite_all(&staged.read(ctx, &file)?, &raws, &dest_id);
            if changed > 0 {
                rewrites.push((file, content));
            }
        }
    }

    let mut summary = format!("move {source_id} -> {dest_id}");
    if !rewrites.is_empty() {
        summary.push_str(&format!(" (updates links in {} file(s))", rewrites.len()));
    }
    Ok((summary, Prepared::Move(MovePlan { source_path, dest_path, dest_content, rewrites })))
}

fn prepare_update_trait(
    ctx: &MutationContext<'_>,
    staged: &Staged,
    args: &UpdateTraitArgs,
) -> Result<(String, Prepared), String> {
    if args.trait_id.trim().is_empty() || args.value.trim().is_empty() {
        return Err("update_trait requires trait_id and value".into());
    }
    let trait_id = args.trait_id.trim();
    let (file, ordinal) = parse_trait_id(trait_id).map_err(|e| e.to_string())?;
    let rel = within_vault(ctx, &file)?;
    if ctx.is_protected(&rel) {
        return Err(format!("trait file is protected: {rel}"));
    }

    let id = format!("{rel}:trait:{ordinal}");
    let content = rewrite_trait_by_id(&staged.read(ctx, &rel)?, &rel, &id, &args.value, ctx.schema)
        .map_err(|e| e.to_string())?;
    Ok((
        format!("update {trait_id} -> {}", args.value.trim()),
        Prepared::Write { file_path: rel, content },
    ))
}

/// `notes/x` and `notes/x.md` both name `notes/x.md`.
fn destination_path(destination: &str) -> String {
    let dest = destination.trim().replace('\\', "/");
    let dest = dest.strip_prefix("./").unwrap_or(&dest);
    if dest.ends_with(".md") { dest.to_string() } else { format!("{dest}.md") }
}

fn rewrite_all(content: &str, raws: &BTreeSet<String>, new_id: &str) -> (String, usize) {
    raws.iter().fold((content.to_string(), 0), |(text, total), raw| {
        let (next, changed) = rewrite_wikilinks(&text, raw, new_id);
        (next, total + changed)
    })
}

fn within_vault(ctx: &MutationContext<'_>, path: &str) -> Result<String, String> {
    validate_within_vault(ctx.vault_root, Path::new(path)).map_err(|e| e.to_string())
}

fn read(ctx: &MutationContext<'_>, rel: &str) -> Result<String, String> {
    std::fs::read_to_string(ctx.vault_root.join(rel)).map_err(|e| format!("cannot read {rel}: {e}"))
}
