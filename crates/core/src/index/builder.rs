//! Index building orchestration.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use super::db::{IndexDb, IndexError};
use crate::config::VaultConfig;
use crate::parser::parse_document;
use crate::resolver::ResolverOptions;
use crate::schema::Schema;
use crate::vault::walker::system_time_to_nanos;
use crate::vault::{VaultWalker, VaultWalkerError};

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Vault walker error: {0}")]
    Walker(#[from] VaultWalkerError),

    #[error("Index database error: {0}")]
    Index(#[from] IndexError),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {0}")]
    Parse(#[from] crate::parser::ParseError),
}

/// A file that could not be indexed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReindexFileError {
    pub file_path: String,
    pub message: String,
}

/// Outcome of a reindex run. Object, trait and reference counts are index
/// totals after the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReindexSummary {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_deleted: usize,
    pub objects: usize,
    pub traits: usize,
    pub references: usize,
    pub schema_rebuilt: bool,
    pub incremental: bool,
    pub refs_resolved: usize,
    pub refs_unresolved: usize,
    pub errors: Vec<ReindexFileError>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub would_index: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub would_delete: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
pub struct ReindexOptions<'c> {
    /// Clear the index and reparse every file.
    pub full: bool,
    /// Detect changes without writing.
    pub dry_run: bool,
    /// Checked between files.
    pub cancel: Option<&'c AtomicBool>,
}

/// Progress callback for indexing operations.
/// Parameters: (current, total, current_path)
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str)>;

/// Keeps the index in step with the vault tree.
pub struct Reindexer<'a> {
    db: &'a IndexDb,
    vault_root: &'a Path,
    config: &'a VaultConfig,
    schema: &'a Schema,
    progress: Option<ProgressCallback>,
    schema_rebuilt: bool,
}

impl<'a> Reindexer<'a> {
    pub fn new(
        db: &'a IndexDb,
        vault_root: &'a Path,
        config: &'a VaultConfig,
        schema: &'a Schema,
    ) -> Self {
        Self { db, vault_root, config, schema, progress: None, schema_rebuilt: false }
    }

    /// Report that the database was recreated on open. Forces a full run.
    pub fn schema_rebuilt(mut self, rebuilt: bool) -> Self {
        self.schema_rebuilt = rebuilt;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(&self, options: &ReindexOptions<'_>) -> Result<ReindexSummary, BuilderError> {
        let start = std::time::Instant::now();
        let full = options.full || self.schema_rebuilt;
        let mut summary = ReindexSummary {
            incremental: !full,
            schema_rebuilt: self.schema_rebuilt,
            dry_run: options.dry_run,
            ..Default::default()
        };

        let excluded = self.config.excluded_prefixes();
        let walker = VaultWalker::with_exclusions(
            self.vault_root,
            excluded.iter().map(|p| PathBuf::from(p.trim_end_matches('/'))).collect(),
        )?;
        let files = walker.walk()?;

        // Excluded and trashed files never stay indexed, and files gone from
        // disk are dropped. Both count as deletions.
        let mut gone: Vec<String> = self
            .db
            .all_indexed_file_paths()?
            .into_iter()
            .filter(|p| excluded.iter().any(|prefix| p.starts_with(prefix.as_str())))
            .collect();
        for path in self.db.deleted_files(self.vault_root)? {
            if !gone.contains(&path) {
                gone.push(path);
            }
        }
        gone.sort();
        summary.files_deleted = gone.len();

        if options.dry_run {
            summary.would_delete = gone;
        } else {
            for prefix in &excluded {
                let purged = self.db.remove_files_with_prefix(prefix)?;
                if purged > 0 {
                    tracing::debug!("Purged {} files under {}", purged, prefix);
                }
            }
            if full {
                self.db.clear_all()?;
            } else {
                for path in self.db.remove_deleted_files(self.vault_root)? {
                    tracing::debug!("Removed deleted file {}", path);
                }
            }
        }

        for (i, file) in files.iter().enumerate() {
            if crate::vault::walker::is_cancelled(options.cancel) {
                return Err(VaultWalkerError::Cancelled.into());
            }
            if let Some(ref cb) = self.progress {
                cb(i + 1, files.len(), &file.relative_path);
            }

            let mtime = file.mtime();
            if !full && mtime <= self.db.get_file_mtime(&file.relative_path)? {
                summary.files_skipped += 1;
                continue;
            }

            if options.dry_run {
                summary.would_index.push(file.relative_path.clone());
                continue;
            }

            let indexed = file
                .load_document()
                .map_err(|e| e.to_string())
                .and_then(|doc| {
                    self.db.index_document(&doc, self.schema, mtime).map_err(|e| e.to_string())
                });
            match indexed {
                Ok(()) => {
                    tracing::debug!("Indexed {}", file.relative_path);
                    summary.files_indexed += 1;
                }
                Err(message) => {
                    tracing::warn!("Failed to index {}: {}", file.relative_path, message);
                    summary.errors.push(ReindexFileError {
                        file_path: file.relative_path.clone(),
                        message,
                    });
                }
            }
        }

        if !options.dry_run {
            let refs = self.db.resolve_references(self.schema, self.resolver_options())?;
            summary.refs_resolved = refs.resolved;
            summary.refs_unresolved = refs.unresolved;
            self.db.analyze()?;
        }

        let counts = self.db.stats()?;
        summary.objects = counts.object_count;
        summary.traits = counts.trait_count;
        summary.references = counts.ref_count;
        summary.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Reindex finished: {} indexed, {} skipped, {} deleted, {} errors in {}ms",
            summary.files_indexed,
            summary.files_skipped,
            summary.files_deleted,
            summary.errors.len(),
            summary.duration_ms
        );

        Ok(summary)
    }

    fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions::new(self.config.daily_dir(), Local::now().date_naive())
            .with_vault(self.vault_root)
    }
}

/// Reindex one vault-relative file, or drop it from the index when it no
/// longer exists. References are re-resolved afterwards.
pub fn reindex_file(
    db: &IndexDb,
    vault_root: &Path,
    rel_path: &str,
    config: &VaultConfig,
    schema: &Schema,
) -> Result<(), BuilderError> {
    if is_excluded(config, rel_path) {
        db.remove_file(rel_path)?;
    } else {
        index_one(db, vault_root, rel_path, schema)?;
    }
    resolve_all(db, vault_root, config, schema)
}

/// Best-effort reindex after a mutation. Honours `auto_reindex`; failures
/// are logged and never surface to the caller.
pub fn maybe_reindex(
    db: &IndexDb,
    vault_root: &Path,
    rel_paths: &[String],
    config: &VaultConfig,
    schema: &Schema,
) {
    if !config.auto_reindex || rel_paths.is_empty() {
        return;
    }
    for rel_path in rel_paths.iter().filter(|p| !is_excluded(config, p)) {
        if let Err(e) = index_one(db, vault_root, rel_path, schema) {
            tracing::warn!("Failed to reindex {}: {}", rel_path, e);
        }
    }
    if let Err(e) = resolve_all(db, vault_root, config, schema) {
        tracing::warn!("Failed to resolve references: {}", e);
    }
}

fn is_excluded(config: &VaultConfig, rel_path: &str) -> bool {
    config.excluded_prefixes().iter().any(|p| rel_path.starts_with(p.as_str()))
}

fn index_one(
    db: &IndexDb,
    vault_root: &Path,
    rel_path: &str,
    schema: &Schema,
) -> Result<(), BuilderError> {
    let abs = vault_root.join(rel_path);
    if !abs.is_file() {
        db.remove_file(rel_path)?;
        return Ok(());
    }
    let content = std::fs::read_to_string(&abs)
        .map_err(|source| BuilderError::FileRead { path: rel_path.to_string(), source })?;
    let mtime = std::fs::metadata(&abs)
        .and_then(|m| m.modified())
        .map(system_time_to_nanos)
        .map_err(|source| BuilderError::FileRead { path: rel_path.to_string(), source })?;
    let doc = parse_document(&content, rel_path)?;
    db.index_document(&doc, schema, mtime)?;
    Ok(())
}

fn resolve_all(
    db: &IndexDb,
    vault_root: &Path,
    config: &VaultConfig,
    schema: &Schema,
) -> Result<(), BuilderError> {
    let options = ResolverOptions::new(config.daily_dir(), Local::now().date_naive())
        .with_vault(vault_root);
    db.resolve_references(schema, options)?;
    Ok(())
}
