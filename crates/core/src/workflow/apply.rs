//! Previewing and committing plans.

use std::fs;

use super::plan::Plan;
use super::types::{ApplyOutcome, OpSummary, WorkflowError};
use super::validate::{MovePlan, Prepared, Staged, prepare};
use crate::mutation::MutationContext;
use crate::vault::write_atomic;

/// Validate every op against the vault without writing anything.
///
/// Ops are checked in order, each seeing the changes of the ops before it.
/// Stops at the first rejected op.
pub fn preview_plan(ctx: &MutationContext<'_>, plan: &Plan) -> Result<Vec<OpSummary>, WorkflowError> {
    Ok(stage_plan(ctx, plan)?.into_iter().map(|(summary, _)| summary).collect())
}

fn stage_plan(
    ctx: &MutationContext<'_>,
    plan: &Plan,
) -> Result<Vec<(OpSummary, Prepared)>, WorkflowError> {
    plan.validate_structure()?;

    let mut staged = Staged::default();
    let mut out = Vec::with_capacity(plan.ops().len());
    for (index, op) in plan.ops().iter().enumerate() {
        match prepare(ctx, &staged, op) {
            Ok((summary, prepared)) => {
                staged.record(&prepared);
                let summary = OpSummary { index, op: op.op.clone(), why: op.why.clone(), summary };
                out.push((summary, prepared));
            }
            Err(reason) => {
                return Err(WorkflowError::Validation { index, op: op.op.clone(), reason });
            }
        }
    }
    Ok(out)
}

/// Preview the plan and, when `confirm` is set, write what the preview
/// computed, op by op.
///
/// Nothing is written unless every op validates. A later failure can only
/// come from the filesystem.
pub fn apply_plan(
    ctx: &MutationContext<'_>,
    plan: &Plan,
    confirm: bool,
) -> Result<ApplyOutcome, WorkflowError> {
    let staged = stage_plan(ctx, plan)?;
    let mut outcome = ApplyOutcome {
        ok: true,
        workflow: plan.workflow.clone(),
        confirm,
        preview: staged.iter().map(|(summary, _)| summary.clone()).collect(),
        applied: Vec::new(),
    };
    if !confirm {
        return Ok(outcome);
    }

    for (summary, prepared) in staged {
        let index = summary.index;
        commit(ctx, &prepared).map_err(|reason| WorkflowError::Apply {
            index,
            op: summary.op.clone(),
            reason,
            applied: index,
        })?;
        ctx.reindex(&prepared.touched());

        tracing::info!("Applied op[{}] ({}): {}", index, summary.op, summary.summary);
        outcome.applied.push(summary);
    }
    Ok(outcome)
}

fn commit(ctx: &MutationContext<'_>, prepared: &Prepared) -> Result<(), String> {
    match prepared {
        Prepared::Write { file_path, content } => {
            write_atomic(&ctx.vault_root.join(file_path), content.as_bytes())
                .map_err(|e| e.to_string())
        }
        Prepared::Move(plan) => commit_move(ctx, plan),
    }
}

fn commit_move(ctx: &MutationContext<'_>, plan: &MovePlan) -> Result<(), String> {
    let source = ctx.vault_root.join(&plan.source_path);
    let dest = ctx.vault_root.join(&plan.dest_path);

    write_atomic(&dest, plan.dest_content.as_bytes()).map_err(|e| e.to_string())?;
    fs::remove_file(&source).map_err(|e| format!("failed to remove {}: {e}", plan.source_path))?;

    for (file, content) in &plan.rewrites {
        write_atomic(&ctx.vault_root.join(file), content.as_bytes()).map_err(|e| e.to_string())?;
    }

    if let Err(e) = ctx.db.remove_file(&plan.source_path) {
        tracing::warn!("Failed to drop {} from index: {}", plan.source_path, e);
    }
    Ok(())
}
