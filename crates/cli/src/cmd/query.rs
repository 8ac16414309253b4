//! Read-only index queries.

use color_eyre::eyre::{eyre, Result};
use quire_core::config::ResolvedConfig;
use quire_core::vault::dates::resolve_date;
use serde::Serialize;

use super::output::{print_json, print_table};
use super::session::Session;
use crate::{BacklinksArgs, DatesArgs, GlobalArgs, TagsArgs, TraitsArgs};

pub fn stats(global: &GlobalArgs, rc: &ResolvedConfig) -> Result<()> {
    let session = Session::open(global, rc)?;
    let counts = session.db.stats()?;

    if global.json {
        print_json(&counts);
    } else {
        println!("Vault: {}", session.vault_root.display());
        println!("  Files:       {}", counts.file_count);
        println!("  Objects:     {}", counts.object_count);
        println!("  Traits:      {}", counts.trait_count);
        println!("  References:  {}", counts.ref_count);
    }
    Ok(())
}

pub fn backlinks(global: &GlobalArgs, rc: &ResolvedConfig, args: &BacklinksArgs) -> Result<()> {
    let session = Session::open(global, rc)?;
    let result = session.resolver(false)?.resolve(&args.reference);
    if result.ambiguous {
        let ids: Vec<_> = result.matches.iter().map(|m| m.object_id.as_str()).collect();
        return Err(eyre!("'{}' is ambiguous: {}", args.reference, ids.join(", ")));
    }
    // Unknown targets still match unresolved links by their raw text
    let target = if result.is_found() { result.target_id } else { args.reference.clone() };
    let refs = session.db.backlinks(&target)?;

    if global.json {
        print_json(&refs);
    } else {
        let rows: Vec<Vec<String>> = refs
            .iter()
            .map(|r| {
                vec![
                    r.file_path.clone(),
                    r.line.to_string(),
                    r.target_id.clone().unwrap_or_else(|| format!("{} (unresolved)", r.target_raw)),
                ]
            })
            .collect();
        print_table(&["FILE", "LINE", "TARGET"], &rows, "backlinks");
    }
    Ok(())
}

pub fn untyped(global: &GlobalArgs, rc: &ResolvedConfig) -> Result<()> {
    let session = Session::open(global, rc)?;
    let pages = session.db.untyped_pages()?;

    if global.json {
        print_json(&pages);
    } else if pages.is_empty() {
        println!("(no untyped pages found)");
    } else {
        for id in &pages {
            println!("{}", id);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TagCount {
    tag: String,
    count: usize,
}

pub fn tags(global: &GlobalArgs, rc: &ResolvedConfig, args: &TagsArgs) -> Result<()> {
    let session = Session::open(global, rc)?;

    match &args.tag {
        Some(tag) => {
            let hits = session.db.query_tags(tag)?;
            if global.json {
                print_json(&hits);
            } else {
                let rows: Vec<Vec<String>> = hits
                    .iter()
                    .map(|h| vec![h.object_id.clone(), h.file_path.clone(), h.line.to_string()])
                    .collect();
                print_table(&["OBJECT", "FILE", "LINE"], &rows, "tagged objects");
            }
        }
        None => {
            let counts: Vec<TagCount> = session
                .db
                .all_tags()?
                .into_iter()
                .map(|(tag, count)| TagCount { tag, count })
                .collect();
            if global.json {
                print_json(&counts);
            } else {
                let rows: Vec<Vec<String>> =
                    counts.iter().map(|c| vec![c.tag.clone(), c.count.to_string()]).collect();
                print_table(&["TAG", "COUNT"], &rows, "tags");
            }
        }
    }
    Ok(())
}

pub fn traits(global: &GlobalArgs, rc: &ResolvedConfig, args: &TraitsArgs) -> Result<()> {
    let session = Session::open(global, rc)?;
    let traits = session.db.query_traits_by_type(&args.trait_type, args.value.as_deref())?;

    if global.json {
        print_json(&traits);
    } else {
        let rows: Vec<Vec<String>> = traits
            .iter()
            .map(|t| {
                vec![
                    t.id.clone(),
                    t.effective_value.clone().unwrap_or_else(|| "-".to_string()),
                    t.content.clone(),
                ]
            })
            .collect();
        print_table(&["ID", "VALUE", "CONTENT"], &rows, "traits");
    }
    Ok(())
}

pub fn dates(global: &GlobalArgs, rc: &ResolvedConfig, args: &DatesArgs) -> Result<()> {
    let session = Session::open(global, rc)?;
    let date = resolve_date(&args.date, session.today)
        .ok_or_else(|| eyre!("Not a date: {} (use YYYY-MM-DD, today, tomorrow or yesterday)", args.date))?;
    let hits = session.db.query_date_index(&date.format("%Y-%m-%d").to_string())?;

    if global.json {
        print_json(&hits);
    } else {
        let rows: Vec<Vec<String>> = hits
            .iter()
            .map(|h| {
                vec![h.source_type.clone(), h.source_id.clone(), h.field_name.clone(), h.file_path.clone()]
            })
            .collect();
        print_table(&["SOURCE", "ID", "FIELD", "FILE"], &rows, "dated entries");
    }
    Ok(())
}
