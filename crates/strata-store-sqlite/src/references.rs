//! The schema reference graph: edges from a schema to the subject versions
//! it depends on.

use rusqlite::{Connection, OptionalExtension as _};
use strata_core::{
  schema::SchemaReference,
  value::{SchemaId, SubjectName, Version},
};

use crate::{
  encode::{RawReference, decode_schema_id},
  schemas, Result,
};

/// One message per reference that does not resolve to an existing subject
/// version. Soft-deleted versions still resolve.
pub fn validate(conn: &Connection, references: &[SchemaReference]) -> Result<Vec<String>> {
  let mut stmt =
    conn.prepare("SELECT 1 FROM subject_versions WHERE subject = ?1 AND version = ?2")?;

  let mut problems = Vec::new();
  for r in references {
    let found = stmt
      .query_row(rusqlite::params![r.subject.as_str(), r.version.get()], |_| Ok(()))
      .optional()?
      .is_some();
    if !found {
      problems.push(format!(
        "reference '{}' points at subject '{}' version {}, which does not exist",
        r.name, r.subject, r.version
      ));
    }
  }
  Ok(problems)
}

/// Bodies of every schema reachable through `references`, dependencies
/// first, each at most once. References that do not resolve are skipped;
/// [`validate`] reports them.
pub fn dependency_texts(conn: &Connection, references: &[SchemaReference]) -> Result<Vec<String>> {
  let mut seen = Vec::new();
  let mut texts = Vec::new();
  collect_dependencies(conn, references, &mut seen, &mut texts)?;
  Ok(texts)
}

fn collect_dependencies(
  conn: &Connection,
  references: &[SchemaReference],
  seen: &mut Vec<SchemaId>,
  texts: &mut Vec<String>,
) -> Result<()> {
  for r in references {
    let target: Option<i64> = conn
      .query_row(
        "SELECT schema_id FROM subject_versions WHERE subject = ?1 AND version = ?2",
        rusqlite::params![r.subject.as_str(), r.version.get()],
        |row| row.get(0),
      )
      .optional()?;
    let Some(id) = target else { continue };
    let id = decode_schema_id(id)?;
    if seen.contains(&id) {
      continue;
    }
    seen.push(id);

    let schema = schemas::get(conn, id)?;
    collect_dependencies(conn, &schema.references, seen, texts)?;
    texts.push(schema.text);
  }
  Ok(())
}

/// Persist the edges of `schema_id`. Edges already recorded are kept as is.
pub fn record(conn: &Connection, schema_id: SchemaId, references: &[SchemaReference]) -> Result<()> {
  let mut stmt = conn.prepare(
    "INSERT OR IGNORE INTO schema_references
       (schema_id, name, referenced_subject, referenced_version)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  for r in references {
    stmt.execute(rusqlite::params![
      schema_id.get(),
      r.name,
      r.subject.as_str(),
      r.version.get()
    ])?;
  }
  Ok(())
}

/// Outgoing edges of `schema_id`, ordered by name.
pub fn for_schema(conn: &Connection, schema_id: SchemaId) -> Result<Vec<SchemaReference>> {
  let mut stmt = conn.prepare(
    "SELECT name, referenced_subject, referenced_version
     FROM schema_references
     WHERE schema_id = ?1
     ORDER BY name",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![schema_id.get()], |row| {
      Ok(RawReference { name: row.get(0)?, subject: row.get(1)?, version: row.get(2)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawReference::into_reference).collect()
}

/// Ids of every schema with an edge into `subject` at `version`.
pub fn referencing_schema_ids(
  conn: &Connection,
  subject: &SubjectName,
  version: Version,
) -> Result<Vec<SchemaId>> {
  let mut stmt = conn.prepare(
    "SELECT DISTINCT schema_id FROM schema_references
     WHERE referenced_subject = ?1 AND referenced_version = ?2
     ORDER BY schema_id",
  )?;
  let ids = stmt
    .query_map(rusqlite::params![subject.as_str(), version.get()], |r| r.get::<_, i64>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  ids.into_iter().map(decode_schema_id).collect()
}
