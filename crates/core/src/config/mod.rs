//! Global and per-vault configuration.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, VAULT_CONFIG_FILE};
pub use types::{CaptureConfig, LoggingConfig, ResolvedConfig, VaultConfig};
