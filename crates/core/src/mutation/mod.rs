//! File mutations guarded by protected paths and followed by a best-effort
//! reindex of every touched file.

pub mod capture;
pub mod traits;

use std::path::Path;

use chrono::NaiveDate;

use crate::config::VaultConfig;
use crate::index::{IndexDb, IndexError, maybe_reindex};
use crate::resolver::{Resolver, ResolverOptions};
use crate::schema::Schema;
use crate::vault::is_protected_rel_path;

pub use capture::{CaptureError, CapturePlan, capture, plan_capture, plan_capture_with};
pub use traits::{
    TraitBulkSummary, TraitMutationError, TraitResult, TraitStatus, TraitUpdate,
};

/// Everything a mutation needs, passed explicitly per call.
#[derive(Clone, Copy)]
pub struct MutationContext<'a> {
    pub db: &'a IndexDb,
    pub vault_root: &'a Path,
    pub config: &'a VaultConfig,
    pub schema: &'a Schema,
    /// Anchor for date keywords.
    pub today: NaiveDate,
}

impl<'a> MutationContext<'a> {
    pub fn resolver(&self, allow_missing: bool) -> Result<Resolver, IndexError> {
        let options = ResolverOptions::new(self.config.daily_dir(), self.today)
            .with_vault(self.vault_root)
            .allow_missing(allow_missing);
        self.db.resolver(self.schema, options)
    }

    pub fn is_protected(&self, rel_path: &str) -> bool {
        is_protected_rel_path(rel_path, &self.config.protected_prefixes)
    }

    /// Reindex touched files when the vault asks for it.
    pub fn reindex(&self, rel_paths: &[String]) {
        maybe_reindex(self.db, self.vault_root, rel_paths, self.config, self.schema);
    }
}
