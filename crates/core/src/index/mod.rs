//! Vault index for fast structured lookup.
//!
//! This module provides SQLite-based indexing for:
//! - Objects (files and their heading sections) with frontmatter fields
//! - Trait annotations with their effective values
//! - Wikilink references, resolved after each run
//! - Dates and tags
//!
//! # Example
//!
//! ```no_run
//! use quire_core::config::VaultConfig;
//! use quire_core::index::{IndexDb, ReindexOptions, Reindexer};
//! use quire_core::schema::Schema;
//! use std::path::Path;
//!
//! let vault = Path::new("/path/to/vault");
//! let (db, rebuilt) = IndexDb::open_with_rebuild(&vault.join(".quire/index.db")).unwrap();
//! let config = VaultConfig::default();
//! let schema = Schema::default();
//!
//! let summary = Reindexer::new(&db, vault, &config, &schema)
//!     .schema_rebuilt(rebuilt)
//!     .run(&ReindexOptions::default())
//!     .unwrap();
//! println!("{} files indexed", summary.files_indexed);
//! ```

pub mod builder;
pub mod db;
mod queries;
pub mod schema;
pub mod types;

pub use builder::{
    BuilderError, ProgressCallback, ReindexFileError, ReindexOptions, ReindexSummary, Reindexer,
    maybe_reindex, reindex_file,
};
pub use db::{IndexDb, IndexError};
pub use schema::{SCHEMA_VERSION, SchemaError};
pub use types::{
    DateHit, IndexCounts, ObjectRecord, RefRecord, RefResolution, TagHit, TraitRecord,
};
