//! `add`: append a capture line to a note.

use color_eyre::eyre::Result;
use quire_core::config::ResolvedConfig;
use quire_core::mutation::capture;

use super::output::print_json;
use super::session::Session;
use crate::{AddArgs, GlobalArgs};

pub fn run(global: &GlobalArgs, rc: &ResolvedConfig, args: &AddArgs) -> Result<()> {
    let session = Session::open(global, rc)?;
    let heading = args.heading.as_deref().or(session.config.capture.heading.as_deref());

    let plan = capture(&session.ctx(), &args.to, &args.text, heading)?;

    if global.json {
        print_json(&plan);
    } else {
        if plan.created {
            println!("Created {}", plan.file_path);
        }
        println!("Added to {}: {}", plan.object_id, plan.line);
    }
    Ok(())
}
