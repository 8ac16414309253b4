mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use quire_core::config::ConfigLoader;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Index, resolve and safely edit a markdown vault")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Vault root (defaults to the configured vault, then the current directory)
    #[arg(long, global = true, env = "QUIRE_VAULT")]
    pub vault: Option<PathBuf>,

    /// Global config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print a JSON envelope instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging and per-file progress
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build or refresh the index
    Reindex(ReindexArgs),

    /// Resolve a reference to an object ID
    Resolve(ResolveArgs),

    /// Show index statistics
    Stats,

    /// List references pointing at an object
    Backlinks(BacklinksArgs),

    /// List pages without a declared type
    Untyped,

    /// List tags, or the objects carrying one tag
    Tags(TagsArgs),

    /// List traits of one type
    Traits(TraitsArgs),

    /// List everything dated on a day
    Dates(DatesArgs),

    /// Bulk trait operations
    #[command(subcommand)]
    Trait(TraitCommands),

    /// Workflow plans
    #[command(subcommand)]
    Plan(PlanCommands),

    /// Append a line to a note (today's daily note by default)
    Add(AddArgs),
}

#[derive(Debug, Args)]
pub struct ReindexArgs {
    /// Clear the index and reindex every file
    #[arg(long)]
    pub full: bool,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    pub reference: String,

    /// Resolve dates to daily notes that do not exist yet
    #[arg(long)]
    pub allow_missing: bool,
}

#[derive(Debug, Args)]
pub struct BacklinksArgs {
    pub reference: String,
}

#[derive(Debug, Args)]
pub struct TagsArgs {
    pub tag: Option<String>,
}

#[derive(Debug, Args)]
pub struct TraitsArgs {
    pub trait_type: String,

    /// Only traits whose effective value equals this
    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Debug, Args)]
pub struct DatesArgs {
    /// YYYY-MM-DD, today, tomorrow or yesterday
    pub date: String,
}

#[derive(Debug, Subcommand)]
pub enum TraitCommands {
    /// Set every trait of a type to a value
    Set(TraitSetArgs),
}

#[derive(Debug, Args)]
pub struct TraitSetArgs {
    pub trait_type: String,
    pub value: String,

    /// Only traits whose current value equals this
    #[arg(long)]
    pub where_value: Option<String>,

    /// Write the changes; without this only a preview is shown
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Debug, Subcommand)]
pub enum PlanCommands {
    /// Preview or apply a plan file (`-` reads stdin)
    Apply(PlanApplyArgs),
}

#[derive(Debug, Args)]
pub struct PlanApplyArgs {
    pub file: PathBuf,

    /// Apply the plan; without this only a preview is shown
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub text: String,

    /// Target reference
    #[arg(long, default_value = "today")]
    pub to: String,

    /// Heading to append under, e.g. "## Log"
    #[arg(long)]
    pub heading: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let rc = ConfigLoader::load(cli.global.config.as_deref())?;
    logging::init(&rc, cli.global.verbose);

    let global = &cli.global;
    let result = match cli.command {
        Commands::Reindex(args) => cmd::reindex::run(global, &rc, &args),
        Commands::Resolve(args) => cmd::resolve::run(global, &rc, &args),
        Commands::Stats => cmd::query::stats(global, &rc),
        Commands::Backlinks(args) => cmd::query::backlinks(global, &rc, &args),
        Commands::Untyped => cmd::query::untyped(global, &rc),
        Commands::Tags(args) => cmd::query::tags(global, &rc, &args),
        Commands::Traits(args) => cmd::query::traits(global, &rc, &args),
        Commands::Dates(args) => cmd::query::dates(global, &rc, &args),
        Commands::Trait(TraitCommands::Set(args)) => cmd::trait_set::run(global, &rc, &args),
        Commands::Plan(PlanCommands::Apply(args)) => cmd::plan::run(global, &rc, &args),
        Commands::Add(args) => cmd::add::run(global, &rc, &args),
    };

    match result {
        Err(e) if global.json => {
            cmd::output::print_error(&e.to_string());
            std::process::exit(1);
        }
        other => other,
    }
}
