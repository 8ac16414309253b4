//! Database connection and write operations.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use super::schema::{SchemaError, init_schema};
use super::types::{IndexCounts, RefResolution};
use crate::parser::Document;
use crate::resolver::{Resolver, ResolverOptions};
use crate::schema::Schema;

/// References resolved per write transaction.
const RESOLVE_BATCH_SIZE: usize = 750;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to prepare index location {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl IndexError {
    /// Whether a fresh database would cure this error.
    pub fn needs_rebuild(&self) -> bool {
        match self {
            IndexError::Schema(SchemaError::Incompatible { .. }) => true,
            IndexError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt
            ),
            _ => false,
        }
    }
}

/// Vault index database handle.
pub struct IndexDb {
    conn: Connection,
}

impl IndexDb {
    /// Open or create an index database at the given path.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|source| IndexError::Io { path: parent.to_path_buf(), source })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open the database, discarding it first if it is incompatible or
    /// unreadable. The flag reports whether a rebuild happened, in which case
    /// the caller owes a full reindex.
    pub fn open_with_rebuild(path: &Path) -> Result<(Self, bool), IndexError> {
        match Self::open(path) {
            Ok(db) => Ok((db, false)),
            Err(e) if e.needs_rebuild() => {
                tracing::warn!("Rebuilding index at {}: {}", path.display(), e);
                remove_database_files(path)?;
                Ok((Self::open(path)?, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get the underlying connection (for transactions).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-file writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace everything indexed for `doc.file_path` with the document's
    /// contents. Runs in one transaction.
    ///
    /// The stored mtime never moves backwards.
    pub fn index_document(
        &self,
        doc: &Document,
        schema: &Schema,
        mtime: i64,
    ) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        delete_file_rows(&tx, &doc.file_path)?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO objects
                 (id, file_path, type, heading, heading_level, fields, line_start, line_end, parent_id, alias)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for obj in &doc.objects {
                let fields = serde_json::to_string(&obj.fields)
                    .map_err(|e| IndexError::InvalidData(e.to_string()))?;
                stmt.execute(params![
                    obj.id,
                    doc.file_path,
                    obj.object_type,
                    obj.heading,
                    obj.heading_level,
                    fields,
                    obj.line_start as i64,
                    obj.line_end as i64,
                    obj.parent_id,
                    obj.alias,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO traits
                 (id, file_path, parent_object_id, trait_type, value, effective_value, content,
                  line_number, span_start, span_end, span_prefix)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for t in &doc.traits {
                let effective = schema.effective_trait_value(&t.trait_type, t.value.as_deref());
                stmt.execute(params![
                    t.id,
                    doc.file_path,
                    t.parent_object_id,
                    t.trait_type,
                    t.value,
                    effective,
                    t.content,
                    t.line as i64,
                    t.span.start as i64,
                    t.span.end as i64,
                    t.span.prefix.map(String::from),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO refs
                 (source_id, target_raw, display_text, file_path, line_number, position_start, position_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for r in &doc.refs {
                stmt.execute(params![
                    r.source_id,
                    r.target_raw,
                    r.display_text,
                    doc.file_path,
                    r.line as i64,
                    r.start as i64,
                    r.end as i64,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO date_index (date, source_type, source_id, field_name, file_path)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for d in &doc.dates {
                stmt.execute(params![
                    d.date,
                    d.source_type.as_str(),
                    d.source_id,
                    d.field_name,
                    doc.file_path,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO tags (tag, object_id, file_path, line_number) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for tag in &doc.tags {
                stmt.execute(params![tag.tag, tag.object_id, doc.file_path, tag.line as i64])?;
            }
        }

        tx.execute(
            "INSERT INTO files (path, mtime, indexed_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET
                mtime = MAX(files.mtime, excluded.mtime),
                indexed_at = excluded.indexed_at",
            params![doc.file_path, mtime, now_nanos()],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Stored mtime for a file, 0 when it was never indexed.
    pub fn get_file_mtime(&self, rel_path: &str) -> Result<i64, IndexError> {
        let mtime: Option<i64> = self
            .conn
            .query_row("SELECT mtime FROM files WHERE path = ?1", [rel_path], |row| row.get(0))
            .optional()?;
        Ok(mtime.unwrap_or(0))
    }

    /// Every file path present in the index, sorted.
    pub fn all_indexed_file_paths(&self) -> Result<Vec<String>, IndexError> {
        let mut stmt = self.conn.prepare(
            "SELECT path FROM files
             UNION SELECT DISTINCT file_path FROM objects
             ORDER BY 1",
        )?;
        let paths = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Remove a single file's rows.
    pub fn remove_file(&self, rel_path: &str) -> Result<(), IndexError> {
        let tx = self.conn.unchecked_transaction()?;
        delete_file_rows(&tx, rel_path)?;
        tx.execute("DELETE FROM files WHERE path = ?1", [rel_path])?;
        tx.commit()?;
        Ok(())
    }

    /// Remove every file whose path starts with `prefix`. Returns the number
    /// of files removed.
    pub fn remove_files_with_prefix(&self, prefix: &str) -> Result<usize, IndexError> {
        let matching: Vec<String> = self
            .all_indexed_file_paths()?
            .into_iter()
            .filter(|p| p.starts_with(prefix))
            .collect();
        for path in &matching {
            self.remove_file(path)?;
        }
        Ok(matching.len())
    }

    /// Indexed files no longer present on disk.
    pub fn deleted_files(&self, vault_root: &Path) -> Result<Vec<String>, IndexError> {
        Ok(self
            .all_indexed_file_paths()?
            .into_iter()
            .filter(|p| !vault_root.join(p).is_file())
            .collect())
    }

    /// Remove indexed files that no longer exist on disk.
    pub fn remove_deleted_files(&self, vault_root: &Path) -> Result<Vec<String>, IndexError> {
        let deleted = self.deleted_files(vault_root)?;
        for path in &deleted {
            self.remove_file(path)?;
        }
        Ok(deleted)
    }

    /// Delete all indexed data. The schema version is kept.
    pub fn clear_all(&self) -> Result<(), IndexError> {
        self.conn.execute_batch(
            "BEGIN;
             DELETE FROM objects;
             DELETE FROM traits;
             DELETE FROM refs;
             DELETE FROM date_index;
             DELETE FROM tags;
             DELETE FROM files;
             COMMIT;",
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Vault-wide passes
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a resolver over the current index contents.
    pub fn resolver(
        &self,
        schema: &Schema,
        options: ResolverOptions,
    ) -> Result<Resolver, IndexError> {
        let tables = self.resolver_tables(schema)?;
        Ok(Resolver::new(tables, options))
    }

    /// Re-resolve every stored reference and write back its target.
    ///
    /// Ambiguous and unresolvable references get a NULL target.
    pub fn resolve_references(
        &self,
        schema: &Schema,
        options: ResolverOptions,
    ) -> Result<RefResolution, IndexError> {
        let resolver = self.resolver(schema, options)?;
        let mut summary = RefResolution::default();
        let mut last_id: i64 = 0;

        loop {
            let batch: Vec<(i64, String)> = {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT id, target_raw FROM refs WHERE id > ?1 ORDER BY id LIMIT ?2",
                )?;
                stmt.query_map(params![last_id, RESOLVE_BATCH_SIZE as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<_, _>>()?
            };
            let Some((max_id, _)) = batch.last() else {
                break;
            };
            last_id = *max_id;

            let tx = self.conn.unchecked_transaction()?;
            {
                let mut update =
                    tx.prepare_cached("UPDATE refs SET target_id = ?1 WHERE id = ?2")?;
                for (id, raw) in &batch {
                    let result = resolver.resolve(raw);
                    summary.total += 1;
                    let target = if result.ambiguous {
                        summary.ambiguous += 1;
                        summary.unresolved += 1;
                        None
                    } else if result.is_found() {
                        summary.resolved += 1;
                        Some(result.target_id)
                    } else {
                        summary.unresolved += 1;
                        None
                    };
                    update.execute(params![target, id])?;
                }
            }
            tx.commit()?;
        }

        Ok(summary)
    }

    /// Row counts.
    pub fn stats(&self) -> Result<IndexCounts, IndexError> {
        let count = |sql: &str| -> Result<usize, IndexError> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(IndexCounts {
            file_count: count("SELECT COUNT(*) FROM files")?,
            object_count: count("SELECT COUNT(*) FROM objects")?,
            trait_count: count("SELECT COUNT(*) FROM traits")?,
            ref_count: count("SELECT COUNT(*) FROM refs")?,
        })
    }

    /// Refresh query planner statistics.
    pub fn analyze(&self) -> Result<(), IndexError> {
        self.conn.execute_batch("ANALYZE;")?;
        Ok(())
    }
}

fn delete_file_rows(conn: &Connection, rel_path: &str) -> Result<(), rusqlite::Error> {
    for table in ["objects", "traits", "refs", "date_index", "tags"] {
        conn.execute(&format!("DELETE FROM {table} WHERE file_path = ?1"), [rel_path])?;
    }
    Ok(())
}

fn remove_database_files(path: &Path) -> Result<(), IndexError> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut s = path.as_os_str().to_owned();
        s.push(suffix);
        candidates.push(PathBuf::from(s));
    }
    for candidate in candidates {
        match std::fs::remove_file(&candidate) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(IndexError::Io { path: candidate, source }),
        }
    }
    Ok(())
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn schema() -> Schema {
        Schema::from_yaml(
            r#"
traits:
  highlight:
    type: boolean
  priority:
    type: enum
    values: [low, medium, high]
    default: medium
"#,
        )
        .unwrap()
    }

    fn index(db: &IndexDb, path: &str, content: &str, mtime: i64) {
        let doc = parse_document(content, path).unwrap();
        db.index_document(&doc, &schema(), mtime).unwrap();
    }

    #[test]
    fn test_open_in_memory() {
        let db = IndexDb::open_in_memory().unwrap();
        assert_eq!(db.stats().unwrap(), IndexCounts::default());
    }

    #[test]
    fn index_document_counts_rows() {
        let db = IndexDb::open_in_memory().unwrap();
        index(
            &db,
            "notes/a.md",
            "---\ntype: page\n---\n# A\n\n- @priority(high) ship it [[people/freya]]\n",
            10,
        );

        let stats = db.stats().unwrap();
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.object_count, 2);
        assert_eq!(stats.trait_count, 1);
        assert_eq!(stats.ref_count, 1);
    }

    #[test]
    fn reindexing_a_file_replaces_its_rows() {
        let db = IndexDb::open_in_memory().unwrap();
        index(&db, "a.md", "@highlight one\n@highlight two\n", 10);
        index(&db, "a.md", "@highlight one\n", 20);

        assert_eq!(db.stats().unwrap().trait_count, 1);
        assert_eq!(db.get_file_mtime("a.md").unwrap(), 20);
    }

    #[test]
    fn mtime_never_regresses() {
        let db = IndexDb::open_in_memory().unwrap();
        index(&db, "a.md", "text\n", 50);
        index(&db, "a.md", "text\n", 30);
        assert_eq!(db.get_file_mtime("a.md").unwrap(), 50);
        assert_eq!(db.get_file_mtime("missing.md").unwrap(), 0);
    }

    #[test]
    fn remove_file_and_prefix() {
        let db = IndexDb::open_in_memory().unwrap();
        index(&db, "a.md", "a\n", 1);
        index(&db, "archive/b.md", "b\n", 1);
        index(&db, "archive/c.md", "c\n", 1);

        assert_eq!(db.remove_files_with_prefix("archive/").unwrap(), 2);
        assert_eq!(db.all_indexed_file_paths().unwrap(), vec!["a.md".to_string()]);

        db.remove_file("a.md").unwrap();
        assert_eq!(db.stats().unwrap(), IndexCounts::default());
    }

    #[test]
    fn remove_deleted_files_checks_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kept.md"), "k\n").unwrap();

        let db = IndexDb::open_in_memory().unwrap();
        index(&db, "kept.md", "k\n", 1);
        index(&db, "gone.md", "g\n", 1);

        let removed = db.remove_deleted_files(dir.path()).unwrap();
        assert_eq!(removed, vec!["gone.md".to_string()]);
        assert_eq!(db.all_indexed_file_paths().unwrap(), vec!["kept.md".to_string()]);
    }

    #[test]
    fn clear_all_keeps_schema() {
        let db = IndexDb::open_in_memory().unwrap();
        index(&db, "a.md", "@highlight\n", 1);
        db.clear_all().unwrap();
        assert_eq!(db.stats().unwrap(), IndexCounts::default());
        index(&db, "a.md", "@highlight\n", 1);
        assert_eq!(db.stats().unwrap().trait_count, 1);
    }

    #[test]
    fn open_with_rebuild_replaces_incompatible_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".quire").join("index.db");

        {
            let db = IndexDb::open(&path).unwrap();
            db.connection()
                .execute("UPDATE meta SET value = '0' WHERE key = 'schema_version'", [])
                .unwrap();
        }

        assert!(matches!(IndexDb::open(&path), Err(IndexError::Schema(_))));
        let (db, rebuilt) = IndexDb::open_with_rebuild(&path).unwrap();
        assert!(rebuilt);
        assert_eq!(db.stats().unwrap(), IndexCounts::default());

        drop(db);
        let (_, rebuilt) = IndexDb::open_with_rebuild(&path).unwrap();
        assert!(!rebuilt);
    }

    #[test]
    fn resolve_references_counts_outcomes() {
        let db = IndexDb::open_in_memory().unwrap();
        index(&db, "people/freya.md", "Freya\n", 1);
        index(&db, "a/x.md", "x\n", 1);
        index(&db, "b/x.md", "x\n", 1);
        index(&db, "notes/n.md", "[[freya]] [[x]] [[nobody]]\n", 1);

        let options = ResolverOptions::new("daily", chrono::NaiveDate::from_ymd_opt(2026, 2, 14).unwrap());
        let summary = db.resolve_references(&schema(), options).unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.ambiguous, 1);
        assert_eq!(summary.unresolved, 2);

        let target: Option<String> = db
            .connection()
            .query_row("SELECT target_id FROM refs WHERE target_raw = 'freya'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(target.as_deref(), Some("people/freya"));
    }
}
