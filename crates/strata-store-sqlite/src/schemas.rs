//! Content-addressed storage of schema bodies.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use strata_core::{
  schema::{SchemaDraft, SchemaRecord},
  store::SchemaIdQuery,
  value::{ContentHash, SchemaId},
};

use crate::{
  encode::{RawSchema, SCHEMA_COLUMNS, decode_schema_id, encode_dt},
  references, Result,
};

/// Return the record holding `draft`'s content, inserting it first if no
/// such record exists.
///
/// An existing record is returned unchanged and `explicit_id` is ignored.
/// Otherwise the new row takes `explicit_id` when given, or the next free
/// id. An explicit id already held by other content is rejected.
pub fn register_or_get_existing(
  conn: &Connection,
  draft: &SchemaDraft,
  explicit_id: Option<SchemaId>,
) -> Result<SchemaRecord> {
  let hash = draft.content_hash();
  if let Some(existing) = find_by_hash(conn, &hash)? {
    return Ok(existing);
  }

  let type_str = draft.schema_type.to_string();
  let at_str = encode_dt(Utc::now());

  match explicit_id {
    Some(id) => {
      let holder: Option<String> = conn
        .query_row(
          "SELECT content_hash FROM schemas WHERE id = ?1",
          rusqlite::params![id.get()],
          |r| r.get(0),
        )
        .optional()?;
      if holder.is_some_and(|h| h != hash.as_str()) {
        return Err(strata_core::Error::SchemaIdConflict(id).into());
      }

      conn.execute(
        "INSERT INTO schemas (id, schema_type, schema_text, content_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (content_hash) DO UPDATE SET id = excluded.id",
        rusqlite::params![id.get(), type_str, draft.text, hash.as_str(), at_str],
      )?;
    }
    None => {
      conn.execute(
        "INSERT INTO schemas (schema_type, schema_text, content_hash, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (content_hash) DO NOTHING",
        rusqlite::params![type_str, draft.text, hash.as_str(), at_str],
      )?;
    }
  }

  let raw = conn.query_row(
    &format!("SELECT {SCHEMA_COLUMNS} FROM schemas WHERE content_hash = ?1"),
    rusqlite::params![hash.as_str()],
    RawSchema::from_row,
  )?;
  tracing::debug!(schema_id = raw.id, hash = %hash, "stored new schema body");
  raw.into_record(Vec::new())
}

pub fn find_by_hash(conn: &Connection, hash: &ContentHash) -> Result<Option<SchemaRecord>> {
  let raw = conn
    .query_row(
      &format!("SELECT {SCHEMA_COLUMNS} FROM schemas WHERE content_hash = ?1"),
      rusqlite::params![hash.as_str()],
      RawSchema::from_row,
    )
    .optional()?;
  raw.map(|r| with_references(conn, r)).transpose()
}

/// Fetch a schema and its reference edges; `SchemaNotFound` if absent.
pub fn get(conn: &Connection, id: SchemaId) -> Result<SchemaRecord> {
  let raw = conn
    .query_row(
      &format!("SELECT {SCHEMA_COLUMNS} FROM schemas WHERE id = ?1"),
      rusqlite::params![id.get()],
      RawSchema::from_row,
    )
    .optional()?
    .ok_or(strata_core::Error::SchemaNotFound(id))?;
  with_references(conn, raw)
}

fn with_references(conn: &Connection, raw: RawSchema) -> Result<SchemaRecord> {
  let refs = references::for_schema(conn, decode_schema_id(raw.id)?)?;
  raw.into_record(refs)
}

/// Schema ids in ascending order.
///
/// Without a prefix, `include_deleted` lists every stored body (orphans
/// included) and otherwise only bodies with an active subject version. With
/// a prefix, only bodies used by matching subjects are listed.
pub fn list_ids(conn: &Connection, query: &SchemaIdQuery) -> Result<Vec<SchemaId>> {
  let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
  let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

  let ids: Vec<i64> = match (&query.subject_prefix, query.include_deleted) {
    (None, true) => {
      let mut stmt = conn.prepare("SELECT id FROM schemas ORDER BY id LIMIT ?1 OFFSET ?2")?;
      stmt
        .query_map(rusqlite::params![limit, offset], |r| r.get(0))?
        .collect::<rusqlite::Result<_>>()?
    }
    (None, false) => {
      let mut stmt = conn.prepare(
        "SELECT DISTINCT schema_id FROM subject_versions
         WHERE deleted = 0
         ORDER BY schema_id LIMIT ?1 OFFSET ?2",
      )?;
      stmt
        .query_map(rusqlite::params![limit, offset], |r| r.get(0))?
        .collect::<rusqlite::Result<_>>()?
    }
    (Some(prefix), include_deleted) => {
      let mut stmt = conn.prepare(
        "SELECT DISTINCT schema_id FROM subject_versions
         WHERE substr(subject, 1, length(?1)) = ?1
           AND (?2 OR deleted = 0)
         ORDER BY schema_id LIMIT ?3 OFFSET ?4",
      )?;
      stmt
        .query_map(rusqlite::params![prefix, include_deleted, limit, offset], |r| r.get(0))?
        .collect::<rusqlite::Result<_>>()?
    }
  };

  ids.into_iter().map(decode_schema_id).collect()
}
