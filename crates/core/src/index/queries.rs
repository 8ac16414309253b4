//! Read-side queries over the index.

use std::collections::BTreeMap;

use rusqlite::{OptionalExtension, Row, params};

use super::db::{IndexDb, IndexError};
use super::types::{DateHit, ObjectRecord, RefRecord, TagHit, TraitRecord};
use crate::parser::tags::normalize_tag;
use crate::parser::TraitSpan;
use crate::parser::types::DEFAULT_OBJECT_TYPE;
use crate::resolver::ResolverTables;
use crate::schema::Schema;

const OBJECT_COLUMNS: &str =
    "id, type, file_path, heading, heading_level, fields, line_start, line_end, parent_id, alias";

const TRAIT_COLUMNS: &str =
    "id, trait_type, value, effective_value, content, file_path, line_number, parent_object_id, \
     span_start, span_end, span_prefix";

impl IndexDb {
    // ─────────────────────────────────────────────────────────────────────────
    // Point lookups
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_object(&self, id: &str) -> Result<Option<ObjectRecord>, IndexError> {
        self.connection()
            .query_row(
                &format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE id = ?1"),
                [id],
                row_to_object,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_trait(&self, id: &str) -> Result<Option<TraitRecord>, IndexError> {
        self.connection()
            .query_row(
                &format!("SELECT {TRAIT_COLUMNS} FROM traits WHERE id = ?1"),
                [id],
                row_to_trait,
            )
            .optional()
            .map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Typed queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Objects of a type, ordered by ID.
    pub fn query_objects(&self, object_type: &str) -> Result<Vec<ObjectRecord>, IndexError> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE type = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([object_type], row_to_object)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Traits of a type, optionally restricted to one effective value.
    pub fn query_traits_by_type(
        &self,
        trait_type: &str,
        value_filter: Option<&str>,
    ) -> Result<Vec<TraitRecord>, IndexError> {
        let mut sql = format!("SELECT {TRAIT_COLUMNS} FROM traits WHERE trait_type = ?");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(trait_type.to_string())];

        if let Some(value) = value_filter {
            sql.push_str(" AND effective_value = ?");
            params_vec.push(Box::new(value.to_string()));
        }
        sql.push_str(" ORDER BY file_path, line_number, span_start");

        let mut stmt = self.connection().prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), row_to_trait)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Everything dated `date` (`YYYY-MM-DD`).
    pub fn query_date_index(&self, date: &str) -> Result<Vec<DateHit>, IndexError> {
        let mut stmt = self.connection().prepare(
            "SELECT date, source_type, source_id, field_name, file_path
             FROM date_index WHERE date = ?1
             ORDER BY file_path, source_id, field_name",
        )?;
        let rows = stmt.query_map([date], |row| {
            Ok(DateHit {
                date: row.get(0)?,
                source_type: row.get(1)?,
                source_id: row.get(2)?,
                field_name: row.get(3)?,
                file_path: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Occurrences of a tag. `#` and case are ignored.
    pub fn query_tags(&self, tag: &str) -> Result<Vec<TagHit>, IndexError> {
        let tag = normalize_tag(tag);
        let mut stmt = self.connection().prepare(
            "SELECT tag, object_id, file_path, line_number FROM tags
             WHERE tag = ?1 ORDER BY file_path, line_number",
        )?;
        let rows = stmt.query_map([tag], |row| {
            Ok(TagHit {
                tag: row.get(0)?,
                object_id: row.get(1)?,
                file_path: row.get(2)?,
                line: row.get::<_, i64>(3)? as usize,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every tag with its occurrence count.
    pub fn all_tags(&self) -> Result<Vec<(String, usize)>, IndexError> {
        let mut stmt = self
            .connection()
            .prepare("SELECT tag, COUNT(*) FROM tags GROUP BY tag ORDER BY tag")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// References pointing at `target` or one of its sections.
    ///
    /// Unresolved references count when their raw text names the target.
    pub fn backlinks(&self, target: &str) -> Result<Vec<RefRecord>, IndexError> {
        let mut stmt = self.connection().prepare(
            "SELECT source_id, target_id, target_raw, display_text, file_path, line_number
             FROM refs
             WHERE target_id = ?1
                OR substr(target_id, 1, length(?1) + 1) = ?1 || '#'
                OR (target_id IS NULL AND (
                    target_raw = ?1 OR substr(target_raw, 1, length(?1) + 1) = ?1 || '#'))
             ORDER BY file_path, line_number, position_start",
        )?;
        let rows = stmt.query_map([target], |row| {
            Ok(RefRecord {
                source_id: row.get(0)?,
                target_id: row.get(1)?,
                target_raw: row.get(2)?,
                display_text: row.get(3)?,
                file_path: row.get(4)?,
                line: row.get::<_, i64>(5)? as usize,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// File objects that fell back to the default type.
    pub fn untyped_pages(&self) -> Result<Vec<String>, IndexError> {
        let mut stmt = self.connection().prepare(
            "SELECT id FROM objects WHERE type = ?1 AND parent_id IS NULL ORDER BY id",
        )?;
        let rows = stmt.query_map(params![DEFAULT_OBJECT_TYPE], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
    }

    /// Lookup tables the resolver matches against.
    pub(crate) fn resolver_tables(&self, schema: &Schema) -> Result<ResolverTables, IndexError> {
        let mut tables = ResolverTables::default();
        let mut stmt = self.connection().prepare(
            "SELECT id, type, fields, alias FROM objects WHERE parent_id IS NULL ORDER BY id",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let object_type: String = row.get(1)?;
            let fields_json: String = row.get(2)?;
            let alias: Option<String> = row.get(3)?;

            if let Some(alias) = alias.filter(|a| !a.trim().is_empty()) {
                tables.aliases.push((alias, id.clone()));
            }

            if let Some(name_field) = schema.name_field(&object_type) {
                let fields: BTreeMap<String, serde_json::Value> =
                    serde_json::from_str(&fields_json).unwrap_or_default();
                if let Some(serde_json::Value::String(name)) = fields.get(name_field)
                    && !name.trim().is_empty()
                {
                    tables.names.push((name.clone(), id.clone()));
                }
            }

            tables.object_ids.push(id);
        }
        Ok(tables)
    }
}

fn row_to_object(row: &Row) -> rusqlite::Result<ObjectRecord> {
    let fields_json: String = row.get(5)?;
    let fields = serde_json::from_str(&fields_json).unwrap_or_default();
    Ok(ObjectRecord {
        id: row.get(0)?,
        object_type: row.get(1)?,
        file_path: row.get(2)?,
        heading: row.get(3)?,
        heading_level: row.get(4)?,
        fields,
        line_start: row.get::<_, i64>(6)? as usize,
        line_end: row.get::<_, i64>(7)? as usize,
        parent_id: row.get(8)?,
        alias: row.get(9)?,
    })
}

fn row_to_trait(row: &Row) -> rusqlite::Result<TraitRecord> {
    let line = row.get::<_, i64>(6)? as usize;
    Ok(TraitRecord {
        id: row.get(0)?,
        trait_type: row.get(1)?,
        value: row.get(2)?,
        effective_value: row.get(3)?,
        content: row.get(4)?,
        file_path: row.get(5)?,
        line,
        parent_object_id: row.get(7)?,
        span: TraitSpan {
            line,
            start: row.get::<_, i64>(8)? as usize,
            end: row.get::<_, i64>(9)? as usize,
            prefix: row.get::<_, Option<String>>(10)?.and_then(|p| p.chars().next()),
        },
    })
}
