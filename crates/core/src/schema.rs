//! Vault schema: object types and trait declarations from `schema.yaml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name of the vault schema.
pub const SCHEMA_FILE: &str = "schema.yaml";

#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Declared object types and traits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDef>,
    #[serde(default)]
    pub traits: BTreeMap<String, TraitDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeDef {
    /// Directory new objects of this type live in.
    #[serde(default)]
    pub default_path: Option<String>,
    /// Frontmatter field whose value names the object (e.g. a book title).
    #[serde(default)]
    pub name_field: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitKind {
    #[default]
    String,
    Boolean,
    Date,
    Enum,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraitDef {
    #[serde(default, rename = "type")]
    pub kind: TraitKind,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Schema {
    /// Load `<vault>/schema.yaml`; a missing file is an empty schema.
    pub fn load(vault_root: &Path) -> Result<Self, SchemaFileError> {
        let path = vault_root.join(SCHEMA_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = fs::read_to_string(&path)
            .map_err(|source| SchemaFileError::Io { path: path.clone(), source })?;
        Self::from_yaml(&s).map_err(|source| SchemaFileError::Parse { path, source })
    }

    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(s)
    }

    /// Name field declared for an object type.
    pub fn name_field(&self, type_name: &str) -> Option<&str> {
        self.types.get(type_name).and_then(|t| t.name_field.as_deref())
    }

    /// Value a bare `@trait` stands for.
    ///
    /// Boolean traits without an explicit default are `"true"`.
    pub fn trait_default(&self, trait_name: &str) -> Option<String> {
        let def = self.traits.get(trait_name)?;
        match &def.default {
            Some(v) => yaml_scalar_to_string(v),
            None if def.kind == TraitKind::Boolean => Some("true".to_string()),
            None => None,
        }
    }

    /// Effective value of a trait occurrence: its explicit value or the default.
    pub fn effective_trait_value(
        &self,
        trait_name: &str,
        value: Option<&str>,
    ) -> Option<String> {
        match value {
            Some(v) => Some(v.to_string()),
            None => self.trait_default(trait_name),
        }
    }
}

/// Render a scalar YAML value as plain text.
pub fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
