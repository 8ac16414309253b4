use std::path::PathBuf;

use serde::Deserialize;

/// Global user configuration (`~/.config/quire/config.toml`).
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    /// Default vault used when neither `--vault` nor `QUIRE_VAULT` is given.
    #[serde(default)]
    pub vault: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Path of the config file that was read, if any.
    pub source: Option<PathBuf>,
    pub default_vault: Option<PathBuf>,
    pub logging: LoggingConfig,
}

/// Per-vault settings read from `<vault>/quire.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Directory holding one note per calendar date.
    #[serde(default = "default_daily_directory")]
    pub daily_directory: String,

    /// Extra vault-relative prefixes that mutations may never touch.
    #[serde(default)]
    pub protected_prefixes: Vec<String>,

    /// Reindex touched files after each successful mutation.
    #[serde(default = "default_auto_reindex")]
    pub auto_reindex: bool,

    /// Folders skipped by the walker and purged from the index.
    #[serde(default)]
    pub excluded_folders: Vec<String>,

    #[serde(default = "default_trash_directory")]
    pub trash_directory: String,

    #[serde(default)]
    pub capture: CaptureConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            daily_directory: default_daily_directory(),
            protected_prefixes: Vec::new(),
            auto_reindex: default_auto_reindex(),
            excluded_folders: Vec::new(),
            trash_directory: default_trash_directory(),
            capture: CaptureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureConfig {
    /// Heading used by `add` when none is given (e.g. `## Captured`).
    #[serde(default)]
    pub heading: Option<String>,
}

fn default_daily_directory() -> String {
    "daily".to_string()
}

fn default_auto_reindex() -> bool {
    true
}

fn default_trash_directory() -> String {
    ".trash".to_string()
}

impl VaultConfig {
    /// Daily directory without surrounding slashes.
    pub fn daily_dir(&self) -> &str {
        self.daily_directory.trim_matches('/')
    }

    /// Whether an object ID lives directly in the daily directory.
    pub fn is_daily_object_id(&self, object_id: &str) -> bool {
        object_id
            .strip_prefix(self.daily_dir())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.contains('/'))
    }

    /// Prefixes whose files are never indexed: the data dir, trash and
    /// configured exclusions, each ending in `/`.
    pub fn excluded_prefixes(&self) -> Vec<String> {
        let mut out = vec![crate::DATA_DIR.to_string() + "/"];
        let trash = self.trash_directory.trim_matches('/');
        if !trash.is_empty() {
            out.push(format!("{trash}/"));
        }
        for folder in &self.excluded_folders {
            let folder = folder.trim_matches('/');
            if !folder.is_empty() {
                out.push(format!("{folder}/"));
            }
        }
        out.sort();
        out.dedup();
        out
    }
}
