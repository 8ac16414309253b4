//! Reindex command implementation.

use std::io::Write;

use color_eyre::eyre::Result;
use quire_core::config::ResolvedConfig;
use quire_core::index::{ProgressCallback, ReindexOptions, ReindexSummary, Reindexer};

use super::output::print_json;
use super::session::{index_path, Session};
use crate::{GlobalArgs, ReindexArgs};

pub fn run(global: &GlobalArgs, rc: &ResolvedConfig, args: &ReindexArgs) -> Result<()> {
    let session = Session::open_with_rebuild(global, rc)?;

    let show_counter = !global.json && !global.verbose;
    let progress: ProgressCallback = if global.verbose {
        Box::new(|current, total, path| {
            eprintln!("[{}/{}] {}", current, total, path);
        })
    } else if show_counter {
        Box::new(|current, total, _path| {
            if current % 50 == 0 || current == total {
                eprint!("\rIndexing... {}/{}", current, total);
                std::io::stderr().flush().ok();
            }
        })
    } else {
        Box::new(|_, _, _| {})
    };

    let reindexer = Reindexer::new(&session.db, &session.vault_root, &session.config, &session.schema)
        .schema_rebuilt(session.rebuilt)
        .with_progress(progress);
    let options = ReindexOptions { full: args.full, dry_run: args.dry_run, cancel: None };
    let summary = reindexer.run(&options)?;

    if show_counter {
        eprintln!();
    }
    if global.json {
        print_json(&summary);
    } else {
        print_summary(&summary);
        println!();
        println!("Index stored at: {}", index_path(&session.vault_root).display());
    }
    Ok(())
}

fn print_summary(s: &ReindexSummary) {
    if s.dry_run {
        println!("Dry run (nothing written):");
        println!("  Would index:    {}", s.would_index.len());
        for path in &s.would_index {
            println!("    {}", path);
        }
        println!("  Would delete:   {}", s.would_delete.len());
        for path in &s.would_delete {
            println!("    {}", path);
        }
        return;
    }

    let mode = if s.incremental { "incremental" } else { "full" };
    println!("Indexing complete ({}):", mode);
    if s.schema_rebuilt {
        println!("  Index was rebuilt for a new schema version");
    }
    println!("  Files indexed:  {}", s.files_indexed);
    println!("  Files skipped:  {}", s.files_skipped);
    if s.files_deleted > 0 {
        println!("  Files deleted:  {}", s.files_deleted);
    }
    println!("  Objects:        {}", s.objects);
    println!("  Traits:         {}", s.traits);
    println!("  References:     {} ({} unresolved)", s.references, s.refs_unresolved);
    println!("  Duration:       {}ms", s.duration_ms);

    if !s.errors.is_empty() {
        println!();
        println!("Errors ({}):", s.errors.len());
        for e in &s.errors {
            println!("  {}: {}", e.file_path, e.message);
        }
    }
}
