//! Vault, config, schema and index opened for one invocation.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use color_eyre::eyre::{eyre, Result, WrapErr};
use quire_core::config::{ConfigLoader, ResolvedConfig, VaultConfig};
use quire_core::index::IndexDb;
use quire_core::mutation::MutationContext;
use quire_core::resolver::{Resolver, ResolverOptions};
use quire_core::schema::Schema;
use quire_core::DATA_DIR;

use crate::GlobalArgs;

pub struct Session {
    pub vault_root: PathBuf,
    pub config: VaultConfig,
    pub schema: Schema,
    pub db: IndexDb,
    /// The database was recreated on open.
    pub rebuilt: bool,
    pub today: NaiveDate,
}

impl Session {
    /// Open the index, failing on an incompatible schema.
    pub fn open(global: &GlobalArgs, rc: &ResolvedConfig) -> Result<Self> {
        Self::open_inner(global, rc, false)
    }

    /// Open the index, recreating it when incompatible.
    pub fn open_with_rebuild(global: &GlobalArgs, rc: &ResolvedConfig) -> Result<Self> {
        Self::open_inner(global, rc, true)
    }

    fn open_inner(global: &GlobalArgs, rc: &ResolvedConfig, rebuild: bool) -> Result<Self> {
        let vault_root = vault_root(global.vault.as_deref(), rc)?;
        let config = ConfigLoader::load_vault(&vault_root)?;
        let schema = Schema::load(&vault_root)?;

        let index_path = index_path(&vault_root);
        let (db, rebuilt) = if rebuild {
            IndexDb::open_with_rebuild(&index_path)?
        } else {
            let db = IndexDb::open(&index_path)
                .wrap_err_with(|| format!("Error opening index {}", index_path.display()))?;
            (db, false)
        };
        tracing::debug!("Opened vault {} (index {})", vault_root.display(), index_path.display());

        Ok(Self { vault_root, config, schema, db, rebuilt, today: Local::now().date_naive() })
    }

    pub fn ctx(&self) -> MutationContext<'_> {
        MutationContext {
            db: &self.db,
            vault_root: &self.vault_root,
            config: &self.config,
            schema: &self.schema,
            today: self.today,
        }
    }

    pub fn resolver(&self, allow_missing: bool) -> Result<Resolver> {
        let options = ResolverOptions::new(self.config.daily_dir(), self.today)
            .with_vault(&self.vault_root)
            .allow_missing(allow_missing);
        Ok(self.db.resolver(&self.schema, options)?)
    }
}

pub fn index_path(vault_root: &Path) -> PathBuf {
    vault_root.join(DATA_DIR).join("index.db")
}

/// `--vault` / `QUIRE_VAULT`, then the configured vault, then the current
/// directory.
fn vault_root(flag: Option<&Path>, rc: &ResolvedConfig) -> Result<PathBuf> {
    let candidate = match (flag, &rc.default_vault) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(p)) => p.clone(),
        (None, None) => std::env::current_dir().wrap_err("Cannot read current directory")?,
    };
    if !candidate.is_dir() {
        return Err(eyre!("Vault directory not found: {}", candidate.display()));
    }
    candidate
        .canonicalize()
        .wrap_err_with(|| format!("Cannot resolve vault path {}", candidate.display()))
}
