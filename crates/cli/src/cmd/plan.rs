//! `plan apply`: preview or apply a workflow plan.

use std::io::Read;

use color_eyre::eyre::{Result, WrapErr};
use quire_core::config::ResolvedConfig;
use quire_core::workflow::{apply_plan, parse_plan, ApplyOutcome};

use super::output::{print_error, print_json};
use super::session::Session;
use crate::{GlobalArgs, PlanApplyArgs};

pub fn run(global: &GlobalArgs, rc: &ResolvedConfig, args: &PlanApplyArgs) -> Result<()> {
    let json = if args.file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).wrap_err("Failed to read plan from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.file)
            .wrap_err_with(|| format!("Failed to read plan {}", args.file.display()))?
    };

    let session = Session::open(global, rc)?;
    let outcome = parse_plan(&json).and_then(|plan| apply_plan(&session.ctx(), &plan, args.confirm));

    match outcome {
        Ok(outcome) => {
            if global.json {
                print_json(&outcome);
            } else {
                print_outcome(&outcome);
            }
            Ok(())
        }
        Err(e) => {
            if global.json {
                print_error(&e.to_string());
            } else {
                eprintln!("Plan rejected: {}", e);
            }
            std::process::exit(if e.is_rejection() { 2 } else { 1 });
        }
    }
}

fn print_outcome(outcome: &ApplyOutcome) {
    if let Some(name) = &outcome.workflow {
        println!("Workflow: {}", name);
    }
    let items = if outcome.confirm { &outcome.applied } else { &outcome.preview };
    for item in items {
        println!("[{}] {}: {}", item.index, item.op, item.summary);
        println!("      why: {}", item.why);
    }
    println!();
    if outcome.confirm {
        println!("Applied {} op(s).", outcome.applied.len());
    } else {
        println!("Preview only; run again with --confirm to apply {} op(s).", outcome.preview.len());
    }
}
