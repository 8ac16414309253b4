#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod frontmatter;
pub mod index;
pub mod markdown_ast;
pub mod mutation;
pub mod parser;
pub mod resolver;
pub mod schema;
pub mod vault;
pub mod workflow;

/// Per-vault data directory holding the index database.
pub const DATA_DIR: &str = ".quire";

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
