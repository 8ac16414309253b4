//! SQLite schema definition and version checks.

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;

/// Current schema version. Any other stored version is incompatible and
/// requires a rebuild.
pub const SCHEMA_VERSION: i32 = 3;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(
        "index schema version {found} is incompatible with {supported}; run `quire reindex --full` to rebuild"
    )]
    Incompatible { found: String, supported: i32 },
}

/// Create the schema on a fresh database or verify an existing one.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    match stored_version(conn)? {
        StoredVersion::Fresh => {
            create_schema(conn)?;
            Ok(())
        }
        StoredVersion::Version(v) if v == SCHEMA_VERSION => Ok(()),
        StoredVersion::Version(v) => Err(SchemaError::Incompatible {
            found: v.to_string(),
            supported: SCHEMA_VERSION,
        }),
        StoredVersion::Unknown => Err(SchemaError::Incompatible {
            found: "unknown".to_string(),
            supported: SCHEMA_VERSION,
        }),
    }
}

enum StoredVersion {
    /// No tables at all.
    Fresh,
    Version(i32),
    /// Tables exist but no version marker.
    Unknown,
}

fn stored_version(conn: &Connection) -> Result<StoredVersion, SchemaError> {
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    if table_count == 0 {
        return Ok(StoredVersion::Fresh);
    }

    let has_meta: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
        [],
        |row| row.get(0),
    )?;
    if !has_meta {
        return Ok(StoredVersion::Unknown);
    }

    let version: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
        .optional()?;

    Ok(match version.and_then(|v| v.parse().ok()) {
        Some(v) => StoredVersion::Version(v),
        None => StoredVersion::Unknown,
    })
}

fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        r#"
        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per indexed file; mtime is the staleness watermark
        CREATE TABLE files (
            path TEXT PRIMARY KEY,
            mtime INTEGER NOT NULL,
            indexed_at INTEGER NOT NULL
        );

        CREATE TABLE objects (
            id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            type TEXT NOT NULL,
            heading TEXT,
            heading_level INTEGER,
            fields TEXT NOT NULL DEFAULT '{}',
            line_start INTEGER NOT NULL,
            line_end INTEGER NOT NULL,
            parent_id TEXT,
            alias TEXT
        );

        CREATE INDEX idx_objects_file ON objects(file_path);
        CREATE INDEX idx_objects_type ON objects(type);
        CREATE INDEX idx_objects_parent ON objects(parent_id);

        CREATE TABLE traits (
            id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            parent_object_id TEXT NOT NULL,
            trait_type TEXT NOT NULL,
            value TEXT,
            effective_value TEXT,
            content TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            span_start INTEGER NOT NULL,
            span_end INTEGER NOT NULL,
            span_prefix TEXT
        );

        CREATE INDEX idx_traits_file ON traits(file_path);
        CREATE INDEX idx_traits_type ON traits(trait_type, effective_value);

        CREATE TABLE refs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id TEXT NOT NULL,
            target_id TEXT,
            target_raw TEXT NOT NULL,
            display_text TEXT,
            file_path TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            position_start INTEGER NOT NULL,
            position_end INTEGER NOT NULL
        );

        CREATE INDEX idx_refs_file ON refs(file_path);
        CREATE INDEX idx_refs_target ON refs(target_id);
        CREATE INDEX idx_refs_target_raw ON refs(target_raw);

        CREATE TABLE date_index (
            date TEXT NOT NULL,
            source_type TEXT NOT NULL,
            source_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            file_path TEXT NOT NULL
        );

        CREATE INDEX idx_date_index_date ON date_index(date);
        CREATE INDEX idx_date_index_file ON date_index(file_path);

        CREATE TABLE tags (
            tag TEXT NOT NULL,
            object_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            line_number INTEGER NOT NULL
        );

        CREATE INDEX idx_tags_tag ON tags(tag);
        CREATE INDEX idx_tags_file ON tags(file_path);
        "#,
    )?;

    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
