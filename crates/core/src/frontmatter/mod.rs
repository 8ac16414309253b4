//! Frontmatter parsing, modification, and serialization.
//!
//! This module provides functionality to:
//! - Parse YAML frontmatter from markdown documents
//! - Set frontmatter fields from plain string updates
//! - Serialize documents back to markdown with frontmatter

pub mod modifier;
pub mod parser;
pub mod serializer;
pub mod types;

pub use modifier::{FrontmatterModifyError, infer_value, set_fields};
pub use parser::{FrontmatterParseError, parse};
pub use serializer::serialize;
pub use types::{Frontmatter, ParsedDocument};
