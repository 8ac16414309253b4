//! `trait set`: bulk-update every trait of one type.

use color_eyre::eyre::Result;
use quire_core::config::ResolvedConfig;
use quire_core::mutation::traits::{apply, preview};
use quire_core::mutation::{TraitBulkSummary, TraitStatus, TraitUpdate};

use super::output::print_json;
use super::session::Session;
use crate::{GlobalArgs, TraitSetArgs};

pub fn run(global: &GlobalArgs, rc: &ResolvedConfig, args: &TraitSetArgs) -> Result<()> {
    let session = Session::open(global, rc)?;
    let ctx = session.ctx();

    let updates: Vec<TraitUpdate> = session
        .db
        .query_traits_by_type(&args.trait_type, args.where_value.as_deref())?
        .into_iter()
        .map(TraitUpdate::from)
        .filter(|t| !ctx.is_protected(&t.file_path))
        .collect();

    let summary = if args.confirm {
        let mut written = Vec::new();
        let summary = apply(
            &session.vault_root,
            &updates,
            &args.value,
            &session.schema,
            |path| written.push(path.to_string()),
        )?;
        ctx.reindex(&written);
        summary
    } else {
        preview(&session.vault_root, &updates, &args.value, &session.schema)?
    };

    if global.json {
        print_json(&summary);
    } else {
        print_summary(&args.trait_type, &summary);
    }

    if summary.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(trait_type: &str, s: &TraitBulkSummary) {
    for r in &s.results {
        let marker = match r.status {
            TraitStatus::Modified => "~",
            TraitStatus::Skipped => "=",
            TraitStatus::Error => "!",
        };
        let old = r.old_value.as_deref().unwrap_or("-");
        match &r.reason {
            Some(reason) if r.status == TraitStatus::Error => {
                println!("{} {}:{}  {}", marker, r.file_path, r.line, reason);
            }
            _ => println!("{} {}:{}  {} -> {}", marker, r.file_path, r.line, old, r.new_value),
        }
    }

    println!();
    let verb = if s.preview { "would modify" } else { "modified" };
    println!(
        "@{}: {} {}, {} skipped, {} errors ({} total)",
        trait_type, verb, s.modified, s.skipped, s.errors, s.total
    );
    if s.preview && s.modified > 0 {
        println!("Run again with --confirm to write the changes.");
    }
}
