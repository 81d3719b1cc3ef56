//! The per-subject version ledger.
//!
//! Version numbers are assigned as `max(version) + 1` over every row of the
//! subject, soft-deleted or not, so a number is never handed out twice. The
//! caller must hold the write lock (`BEGIN IMMEDIATE`) between
//! [`next_version`] and [`save`].

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension as _};
use strata_core::{
  compatibility::HistoricalSchema,
  schema::{SubjectVersionKey, SubjectVersionRecord},
  store::SubjectQuery,
  value::{ContentHash, Context, SchemaId, SubjectName, Version, VersionSelector},
};

use crate::{
  encode::{
    RawHistorical, RawSubjectVersion, SUBJECT_VERSION_COLUMNS, decode_subject, decode_version,
    encode_dt,
  },
  Result,
};

// ─── Existence ───────────────────────────────────────────────────────────────

/// Whether `subject` has any row at all, soft-deleted ones included.
pub fn has_rows(conn: &Connection, subject: &SubjectName) -> Result<bool> {
  Ok(conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM subject_versions WHERE subject = ?1)",
    rusqlite::params![subject.as_str()],
    |r| r.get(0),
  )?)
}

pub fn has_active(conn: &Connection, subject: &SubjectName) -> Result<bool> {
  Ok(conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM subject_versions WHERE subject = ?1 AND deleted = 0)",
    rusqlite::params![subject.as_str()],
    |r| r.get(0),
  )?)
}

/// Whether any subject has an active version.
pub fn any_active(conn: &Connection) -> Result<bool> {
  Ok(conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM subject_versions WHERE deleted = 0)",
    [],
    |r| r.get(0),
  )?)
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub fn next_version(conn: &Connection, subject: &SubjectName) -> Result<Version> {
  let next: i64 = conn.query_row(
    "SELECT COALESCE(MAX(version), 0) + 1 FROM subject_versions WHERE subject = ?1",
    rusqlite::params![subject.as_str()],
    |r| r.get(0),
  )?;
  decode_version(next)
}

/// `Latest` resolves to the highest version passing the deletion filter.
pub fn find(
  conn: &Connection,
  subject: &SubjectName,
  selector: VersionSelector,
  include_deleted: bool,
) -> Result<Option<SubjectVersionRecord>> {
  let raw = match selector {
    VersionSelector::Exact(v) => conn
      .query_row(
        &format!(
          "SELECT {SUBJECT_VERSION_COLUMNS} FROM subject_versions
           WHERE subject = ?1 AND version = ?2 AND (?3 OR deleted = 0)"
        ),
        rusqlite::params![subject.as_str(), v.get(), include_deleted],
        RawSubjectVersion::from_row,
      )
      .optional()?,
    VersionSelector::Latest => conn
      .query_row(
        &format!(
          "SELECT {SUBJECT_VERSION_COLUMNS} FROM subject_versions
           WHERE subject = ?1 AND (?2 OR deleted = 0)
           ORDER BY version DESC LIMIT 1"
        ),
        rusqlite::params![subject.as_str(), include_deleted],
        RawSubjectVersion::from_row,
      )
      .optional()?,
  };
  raw.map(RawSubjectVersion::into_record).transpose()
}

/// Like [`find`], but a miss is an error.
///
/// A subject with no rows, or a `Latest` miss, is `SubjectNotFound`; an
/// exact miss on a known subject is `VersionNotFound`.
pub fn resolve(
  conn: &Connection,
  subject: &SubjectName,
  selector: VersionSelector,
  include_deleted: bool,
) -> Result<SubjectVersionRecord> {
  if let Some(record) = find(conn, subject, selector, include_deleted)? {
    return Ok(record);
  }
  let err = match selector {
    VersionSelector::Exact(version) if has_rows(conn, subject)? => {
      strata_core::Error::VersionNotFound { subject: subject.clone(), version }
    }
    _ => strata_core::Error::SubjectNotFound(subject.clone()),
  };
  Err(err.into())
}

/// The version of `subject` pointing at the schema with `hash`, newest first.
pub fn find_by_hash(
  conn: &Connection,
  subject: &SubjectName,
  hash: &ContentHash,
  active_only: bool,
) -> Result<Option<SubjectVersionRecord>> {
  let raw = conn
    .query_row(
      "SELECT sv.id, sv.subject, sv.version, sv.schema_id, sv.deleted, sv.created_at
       FROM subject_versions sv
       JOIN schemas s ON s.id = sv.schema_id
       WHERE sv.subject = ?1 AND s.content_hash = ?2 AND (NOT ?3 OR sv.deleted = 0)
       ORDER BY sv.version DESC LIMIT 1",
      rusqlite::params![subject.as_str(), hash.as_str(), active_only],
      RawSubjectVersion::from_row,
    )
    .optional()?;
  raw.map(RawSubjectVersion::into_record).transpose()
}

/// Ascending version numbers of `subject`.
pub fn list_versions(
  conn: &Connection,
  subject: &SubjectName,
  include_deleted: bool,
) -> Result<Vec<Version>> {
  let mut stmt = conn.prepare(
    "SELECT version FROM subject_versions
     WHERE subject = ?1 AND (?2 OR deleted = 0)
     ORDER BY version",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![subject.as_str(), include_deleted], |r| r.get::<_, i64>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_version).collect()
}

/// Active versions of `subject` with their schema text, newest first.
///
/// `up_to` bounds the versions from above (inclusive); `limit` keeps only
/// the newest `n`, `None` keeps all.
pub fn active_history(
  conn: &Connection,
  subject: &SubjectName,
  up_to: Option<Version>,
  limit: Option<usize>,
) -> Result<Vec<HistoricalSchema>> {
  if limit == Some(0) {
    return Ok(Vec::new());
  }
  let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
  let up_to = up_to.map(Version::get);

  let mut stmt = conn.prepare(
    "SELECT sv.version, sv.schema_id, s.schema_text
     FROM subject_versions sv
     JOIN schemas s ON s.id = sv.schema_id
     WHERE sv.subject = ?1 AND sv.deleted = 0 AND (?2 IS NULL OR sv.version <= ?2)
     ORDER BY sv.version DESC
     LIMIT ?3",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![subject.as_str(), up_to, limit], |row| {
      Ok(RawHistorical { version: row.get(0)?, schema_id: row.get(1)?, text: row.get(2)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawHistorical::into_historical).collect()
}

/// Every `(subject, version)` pointing at `schema_id`, deleted ones included.
pub fn usages(conn: &Connection, schema_id: SchemaId) -> Result<Vec<SubjectVersionKey>> {
  let mut stmt = conn.prepare(
    "SELECT subject, version FROM subject_versions
     WHERE schema_id = ?1
     ORDER BY subject, version",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![schema_id.get()], |r| {
      Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|(subject, version)| {
      Ok(SubjectVersionKey { subject: decode_subject(subject)?, version: decode_version(version)? })
    })
    .collect()
}

// ─── Subjects & contexts ─────────────────────────────────────────────────────

/// Subject names in ascending order.
pub fn list_subjects(conn: &Connection, query: &SubjectQuery) -> Result<Vec<SubjectName>> {
  // deleted_only wins over include_deleted.
  let having = if query.deleted_only {
    "HAVING SUM(deleted) > 0"
  } else if query.include_deleted {
    ""
  } else {
    "HAVING SUM(deleted = 0) > 0"
  };
  let sql = format!(
    "SELECT subject FROM subject_versions
     WHERE (?1 IS NULL OR substr(subject, 1, length(?1)) = ?1)
     GROUP BY subject
     {having}
     ORDER BY subject"
  );

  let mut stmt = conn.prepare(&sql)?;
  let names = stmt
    .query_map(rusqlite::params![query.prefix.as_deref()], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  names.into_iter().map(decode_subject).collect()
}

/// Contexts of every subject with a row, plus the default context.
pub fn list_contexts(conn: &Connection) -> Result<Vec<Context>> {
  let mut stmt = conn.prepare("SELECT DISTINCT subject FROM subject_versions")?;
  let names = stmt
    .query_map([], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut contexts = BTreeSet::from([Context::default()]);
  for name in names {
    contexts.insert(decode_subject(name)?.context());
  }
  Ok(contexts.into_iter().collect())
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Insert `record` and return it with its assigned row id.
pub fn save(conn: &Connection, mut record: SubjectVersionRecord) -> Result<SubjectVersionRecord> {
  conn.execute(
    "INSERT INTO subject_versions (subject, version, schema_id, deleted, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      record.subject.as_str(),
      record.version.get(),
      record.schema_id.get(),
      record.deleted,
      encode_dt(record.created_at),
    ],
  )?;
  record.id = conn.last_insert_rowid();
  Ok(record)
}

pub fn soft_delete(conn: &Connection, subject: &SubjectName, version: Version) -> Result<()> {
  conn.execute(
    "UPDATE subject_versions SET deleted = 1 WHERE subject = ?1 AND version = ?2",
    rusqlite::params![subject.as_str(), version.get()],
  )?;
  Ok(())
}

pub fn soft_delete_all(conn: &Connection, subject: &SubjectName) -> Result<()> {
  conn.execute(
    "UPDATE subject_versions SET deleted = 1 WHERE subject = ?1",
    rusqlite::params![subject.as_str()],
  )?;
  Ok(())
}

pub fn hard_delete(conn: &Connection, subject: &SubjectName, version: Version) -> Result<()> {
  conn.execute(
    "DELETE FROM subject_versions WHERE subject = ?1 AND version = ?2",
    rusqlite::params![subject.as_str(), version.get()],
  )?;
  Ok(())
}

pub fn hard_delete_all(conn: &Connection, subject: &SubjectName) -> Result<()> {
  conn.execute(
    "DELETE FROM subject_versions WHERE subject = ?1",
    rusqlite::params![subject.as_str()],
  )?;
  Ok(())
}
