//! Vault file discovery, path rules and durable writes.
//!
//! This module provides utilities for walking vault directories, mapping
//! between file paths and object IDs, enforcing protected paths, and writing
//! files atomically.

pub mod atomic;
pub mod dates;
pub mod paths;
pub mod walker;

pub use atomic::{AtomicWriteError, write_atomic};
pub use paths::{PathError, is_protected_abs, is_protected_rel_path, validate_within_vault};
pub use walker::{VaultWalker, VaultWalkerError, WalkEntry, WalkedFile};
