//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Enums are stored under their wire names
//! (`BACKWARD`, `READWRITE`, `AVRO`). Ids and versions are integers.
//! Anything the domain constructors reject on the way out is a
//! [`Error::Decode`], never a caller-facing validation error.

use chrono::{DateTime, Utc};
use strata_core::{
  compatibility::HistoricalSchema,
  config::{CompatibilityLevel, GlobalConfig, Mode, SubjectConfig},
  schema::{SchemaRecord, SchemaReference, SubjectVersionRecord},
  value::{ContentHash, SchemaId, SchemaType, SubjectName, Version},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn corrupt(e: strata_core::Error) -> Error { Error::Decode(e.to_string()) }

pub fn decode_subject(s: String) -> Result<SubjectName> { SubjectName::new(s).map_err(corrupt) }

pub fn decode_version(n: i64) -> Result<Version> { Version::new(n).map_err(corrupt) }

pub fn decode_schema_id(n: i64) -> Result<SchemaId> { SchemaId::new(n).map_err(corrupt) }

fn decode_hash(s: String) -> Result<ContentHash> { ContentHash::parse(s).map_err(corrupt) }

fn decode_schema_type(s: &str) -> Result<SchemaType> { SchemaType::parse(s).map_err(corrupt) }

fn decode_level(s: &str) -> Result<CompatibilityLevel> {
  CompatibilityLevel::parse(s).map_err(corrupt)
}

fn decode_mode(s: &str) -> Result<Mode> { Mode::parse(s).map_err(corrupt) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSubjectVersion::from_row`].
pub const SUBJECT_VERSION_COLUMNS: &str = "id, subject, version, schema_id, deleted, created_at";

/// Raw values read directly from a `subject_versions` row.
pub struct RawSubjectVersion {
  pub id:         i64,
  pub subject:    String,
  pub version:    i64,
  pub schema_id:  i64,
  pub deleted:    bool,
  pub created_at: String,
}

impl RawSubjectVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      subject:    row.get(1)?,
      version:    row.get(2)?,
      schema_id:  row.get(3)?,
      deleted:    row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<SubjectVersionRecord> {
    Ok(SubjectVersionRecord {
      id:         self.id,
      subject:    decode_subject(self.subject)?,
      version:    decode_version(self.version)?,
      schema_id:  decode_schema_id(self.schema_id)?,
      deleted:    self.deleted,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawSchema::from_row`].
pub const SCHEMA_COLUMNS: &str = "id, schema_type, schema_text, content_hash, created_at";

/// Raw values read directly from a `schemas` row.
pub struct RawSchema {
  pub id:           i64,
  pub schema_type:  String,
  pub schema_text:  String,
  pub content_hash: String,
  pub created_at:   String,
}

impl RawSchema {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      schema_type:  row.get(1)?,
      schema_text:  row.get(2)?,
      content_hash: row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_record(self, references: Vec<SchemaReference>) -> Result<SchemaRecord> {
    Ok(SchemaRecord {
      id: decode_schema_id(self.id)?,
      schema_type: decode_schema_type(&self.schema_type)?,
      text: self.schema_text,
      hash: decode_hash(self.content_hash)?,
      created_at: decode_dt(&self.created_at)?,
      references,
    })
  }
}

/// `(name, referenced_subject, referenced_version)` of a `schema_references`
/// row.
pub struct RawReference {
  pub name:    String,
  pub subject: String,
  pub version: i64,
}

impl RawReference {
  pub fn into_reference(self) -> Result<SchemaReference> {
    Ok(SchemaReference {
      name:    self.name,
      subject: decode_subject(self.subject)?,
      version: decode_version(self.version)?,
    })
  }
}

/// One active version joined with its schema text, for compatibility checks.
pub struct RawHistorical {
  pub version:   i64,
  pub schema_id: i64,
  pub text:      String,
}

impl RawHistorical {
  pub fn into_historical(self) -> Result<HistoricalSchema> {
    Ok(HistoricalSchema {
      version:      decode_version(self.version)?,
      schema_id:    decode_schema_id(self.schema_id)?,
      text:         self.text,
      dependencies: Vec::new(),
    })
  }
}

pub struct RawGlobalConfig {
  pub compatibility: String,
  pub mode:          String,
  pub updated_at:    String,
}

impl RawGlobalConfig {
  pub fn into_config(self) -> Result<GlobalConfig> {
    Ok(GlobalConfig {
      compatibility: decode_level(&self.compatibility)?,
      mode:          decode_mode(&self.mode)?,
      updated_at:    Some(decode_dt(&self.updated_at)?),
    })
  }
}

pub struct RawSubjectConfig {
  pub subject:       String,
  pub compatibility: Option<String>,
  pub mode:          Option<String>,
  pub alias:         Option<String>,
  pub normalize:     bool,
  pub updated_at:    String,
}

impl RawSubjectConfig {
  pub fn into_config(self) -> Result<SubjectConfig> {
    Ok(SubjectConfig {
      subject:       decode_subject(self.subject)?,
      compatibility: self.compatibility.as_deref().map(decode_level).transpose()?,
      mode:          self.mode.as_deref().map(decode_mode).transpose()?,
      alias:         self.alias,
      normalize:     self.normalize,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}
