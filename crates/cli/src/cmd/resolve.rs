//! Resolve command implementation.

use color_eyre::eyre::Result;
use quire_core::config::ResolvedConfig;
use quire_core::resolver::{MatchCandidate, ResolveResult};
use serde::Serialize;

use super::output::{print_json, print_json_failure};
use super::session::Session;
use crate::{GlobalArgs, ResolveArgs};

#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    pub reference: String,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub is_section: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_source: Option<&'static str>,
    pub ambiguous: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchCandidate>,
}

impl ResolveOutput {
    fn new(reference: &str, result: ResolveResult) -> Self {
        let resolved = result.is_found();
        Self {
            reference: reference.to_string(),
            resolved,
            match_source: result.match_source().map(|s| s.as_str()),
            object_id: resolved.then(|| result.target_id.clone()),
            file_path: resolved.then(|| result.file_path.clone()),
            is_section: resolved && result.is_section,
            ambiguous: result.ambiguous,
            matches: if result.ambiguous { result.matches } else { Vec::new() },
        }
    }
}

pub fn run(global: &GlobalArgs, rc: &ResolvedConfig, args: &ResolveArgs) -> Result<()> {
    let session = Session::open(global, rc)?;
    let result = session.resolver(args.allow_missing)?.resolve(&args.reference);
    let output = ResolveOutput::new(&args.reference, result);

    let error = if output.ambiguous {
        Some(format!("'{}' is ambiguous ({} matches)", args.reference, output.matches.len()))
    } else if !output.resolved {
        Some(format!("reference not found: {}", args.reference))
    } else {
        None
    };

    if global.json {
        match &error {
            Some(e) => print_json_failure(&output, e),
            None => print_json(&output),
        }
    } else if output.resolved {
        println!("{}", output.object_id.as_deref().unwrap_or_default());
        println!("  file:   {}", output.file_path.as_deref().unwrap_or_default());
        println!("  via:    {}", output.match_source.unwrap_or("-"));
        if output.is_section {
            println!("  (section)");
        }
    } else if output.ambiguous {
        eprintln!("'{}' is ambiguous:", args.reference);
        for m in &output.matches {
            eprintln!("  {} ({})", m.object_id, m.source);
        }
    } else {
        eprintln!("Reference not found: {}", args.reference);
    }

    if error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}
