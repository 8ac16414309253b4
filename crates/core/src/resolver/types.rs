//! Resolver types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Strategy that produced a candidate, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    LiteralPath,
    ObjectId,
    ShortName,
    Alias,
    NameField,
    Date,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::LiteralPath => "literal_path",
            MatchSource::ObjectId => "object_id",
            MatchSource::ShortName => "short_name",
            MatchSource::Alias => "alias",
            MatchSource::NameField => "name_field",
            MatchSource::Date => "date",
        }
    }
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub object_id: String,
    #[serde(rename = "match_source")]
    pub source: MatchSource,
}

/// Candidates gathered by one strategy, unique by object ID.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<MatchCandidate>,
}

impl CandidateSet {
    /// Add a candidate unless its object ID is already present.
    pub fn insert(&mut self, object_id: impl Into<String>, source: MatchSource) {
        let object_id = object_id.into();
        if !self.items.iter().any(|c| c.object_id == object_id) {
            self.items.push(MatchCandidate { object_id, source });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<MatchCandidate> {
        self.items
    }
}

/// Per-call resolution options.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Vault root; enables the literal-path strategy.
    pub vault_path: Option<PathBuf>,
    pub daily_directory: String,
    /// Resolve dates to daily notes that do not exist yet.
    pub allow_missing: bool,
    /// Anchor for `today`/`tomorrow`/`yesterday`.
    pub today: NaiveDate,
}

impl ResolverOptions {
    pub fn new(daily_directory: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            vault_path: None,
            daily_directory: daily_directory.into(),
            allow_missing: false,
            today,
        }
    }

    pub fn with_vault(mut self, vault_path: impl Into<PathBuf>) -> Self {
        self.vault_path = Some(vault_path.into());
        self
    }

    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolveResult {
    /// Winning object ID (with fragment); empty when not found or ambiguous.
    pub target_id: String,
    pub ambiguous: bool,
    /// Every candidate of the deciding strategy.
    pub matches: Vec<MatchCandidate>,
    pub match_sources: BTreeMap<String, MatchSource>,
    pub is_section: bool,
    /// File-level object ID of the target.
    pub file_object_id: String,
    /// Vault-relative path of the target file.
    pub file_path: String,
}

impl ResolveResult {
    pub fn is_found(&self) -> bool {
        !self.ambiguous && !self.target_id.is_empty()
    }

    /// Strategy of the winning candidate.
    pub fn match_source(&self) -> Option<MatchSource> {
        if self.is_found() {
            self.match_sources.get(&self.file_object_id).copied()
        } else {
            None
        }
    }

    /// Absolute path of the target file.
    pub fn resolve_path(&self, vault_root: &Path) -> Option<PathBuf> {
        if self.is_found() { Some(vault_root.join(&self.file_path)) } else { None }
    }

    /// Convert into an error unless exactly one object matched.
    pub fn into_unique(self, reference: &str) -> Result<Self, ResolveError> {
        if self.ambiguous {
            Err(ResolveError::Ambiguous { reference: reference.to_string(), matches: self.matches })
        } else if self.target_id.is_empty() {
            Err(ResolveError::NotFound(reference.to_string()))
        } else {
            Ok(self)
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("reference not found: {0}")]
    NotFound(String),

    #[error("reference '{reference}' is ambiguous: {}", describe(.matches))]
    Ambiguous { reference: String, matches: Vec<MatchCandidate> },
}

fn describe(matches: &[MatchCandidate]) -> String {
    matches
        .iter()
        .map(|m| format!("{} ({})", m.object_id, m.source))
        .collect::<Vec<_>>()
        .join(", ")
}
