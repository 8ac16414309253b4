//! Object ID mapping, vault containment and protected paths.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Prefixes no mutation may touch, regardless of configuration.
pub const BUILTIN_PROTECTED: &[&str] = &[".quire/", ".trash/", ".git/", "quire.toml", "schema.yaml"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path escapes the vault: {0}")]
    OutsideVault(String),

    #[error("empty path")]
    Empty,
}

/// `people/freya.md` -> `people/freya`
pub fn file_path_to_object_id(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./");
    trimmed.strip_suffix(".md").unwrap_or(trimmed).to_string()
}

/// `people/freya` -> `people/freya.md`
pub fn object_id_to_file_path(object_id: &str) -> String {
    let id = object_id.split('#').next().unwrap_or(object_id);
    if id.ends_with(".md") { id.to_string() } else { format!("{id}.md") }
}

/// Lexically resolve `candidate` against the vault and return the
/// slash-separated vault-relative path.
///
/// Relative candidates are taken relative to the vault root. `..` segments
/// that climb above the root are rejected.
pub fn validate_within_vault(vault_root: &Path, candidate: &Path) -> Result<String, PathError> {
    let relative = if candidate.is_absolute() {
        let root = normalize(vault_root)
            .ok_or_else(|| PathError::OutsideVault(vault_root.display().to_string()))?;
        let cand = normalize(candidate)
            .ok_or_else(|| PathError::OutsideVault(candidate.display().to_string()))?;
        cand.strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| PathError::OutsideVault(candidate.display().to_string()))?
    } else {
        normalize(candidate)
            .ok_or_else(|| PathError::OutsideVault(candidate.display().to_string()))?
    };

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(parts.join("/"))
}

/// Collapse `.` and `..` without touching the filesystem.
/// Returns `None` when `..` climbs above the start.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(s) => {
                out.push(s);
                depth += 1;
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Whether a vault-relative path falls under a protected prefix.
///
/// A prefix ending in `/` protects that directory. Any other prefix protects
/// the exact file and, if it is a directory name, everything below it.
pub fn is_protected_rel_path(rel_path: &str, extra: &[String]) -> bool {
    let rel = rel_path.replace('\\', "/");
    let rel = rel.trim_start_matches("./");

    BUILTIN_PROTECTED
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .map(|p| p.trim_start_matches("./"))
        .filter(|p| !p.is_empty() && *p != "/")
        .any(|prefix| {
            if let Some(dir) = prefix.strip_suffix('/') {
                rel == dir || rel.starts_with(prefix)
            } else {
                rel == prefix || rel.starts_with(&format!("{prefix}/"))
            }
        })
}

/// Protected check for an absolute path. Any failure to place the path
/// inside the vault counts as protected.
pub fn is_protected_abs(vault_root: &Path, abs_path: &Path, extra: &[String]) -> bool {
    match validate_within_vault(vault_root, abs_path) {
        Ok(rel) => is_protected_rel_path(&rel, extra),
        Err(_) => true,
    }
}
