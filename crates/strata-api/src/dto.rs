//! Wire shapes shared by several handler modules.
//!
//! Field names follow the Confluent REST API (`schemaType`, camelCase
//! elsewhere). Domain types never appear on the wire directly.

use serde::{Deserialize, Serialize};
use strata_core::{
  schema::{SchemaDraft, SchemaRecord, SchemaReference, SubjectVersionRecord},
  value::{SchemaId, SchemaType, SubjectName, Version},
};

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct ReferenceBody {
  pub name:    String,
  pub subject: String,
  pub version: i64,
}

/// Body of registration, lookup and compatibility requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBody {
  pub schema:      String,
  pub schema_type: Option<String>,
  #[serde(default)]
  pub references:  Vec<ReferenceBody>,
  /// Explicit id; only honoured while the subject is in IMPORT mode.
  pub id:          Option<i64>,
}

impl SchemaBody {
  /// Validate the body's scalar fields and build a draft. A missing
  /// `schemaType` means Avro.
  pub fn into_draft(self) -> strata_core::Result<(SchemaDraft, Option<SchemaId>)> {
    let schema_type = match self.schema_type.as_deref() {
      Some(t) => SchemaType::parse(t)?,
      None => SchemaType::Avro,
    };
    let references = self
      .references
      .into_iter()
      .map(|r| {
        Ok(SchemaReference {
          name:    r.name,
          subject: SubjectName::new(r.subject)?,
          version: Version::new(r.version)?,
        })
      })
      .collect::<strata_core::Result<Vec<_>>>()?;
    let id = self.id.map(SchemaId::new).transpose()?;
    Ok((SchemaDraft::new(schema_type, self.schema).with_references(references), id))
  }
}

// ─── Responses ───────────────────────────────────────────────────────────────

fn is_avro(t: &SchemaType) -> bool { *t == SchemaType::Avro }

/// `{subject, version, id, schemaType?, schema, references?}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
  pub subject:     String,
  pub version:     u32,
  pub id:          u32,
  #[serde(default, skip_serializing_if = "is_avro")]
  pub schema_type: SchemaType,
  pub schema:      String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub references:  Vec<ReferenceBody>,
}

impl VersionResponse {
  pub fn new(record: &SubjectVersionRecord, schema: SchemaRecord) -> Self {
    Self {
      subject:     record.subject.to_string(),
      version:     record.version.get(),
      id:          record.schema_id.get(),
      schema_type: schema.schema_type,
      schema:      schema.text,
      references:  schema.references.into_iter().map(ReferenceBody::from).collect(),
    }
  }
}

impl From<SchemaReference> for ReferenceBody {
  fn from(r: SchemaReference) -> Self {
    Self { name: r.name, subject: r.subject.to_string(), version: i64::from(r.version.get()) }
  }
}

/// `GET /schemas/ids/{id}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
  pub schema:      String,
  #[serde(default, skip_serializing_if = "is_avro")]
  pub schema_type: SchemaType,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub references:  Vec<ReferenceBody>,
}

impl From<SchemaRecord> for SchemaResponse {
  fn from(schema: SchemaRecord) -> Self {
    Self {
      schema:      schema.text,
      schema_type: schema.schema_type,
      references:  schema.references.into_iter().map(ReferenceBody::from).collect(),
    }
  }
}

/// `POST /subjects/{subject}/versions`
#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
  pub id: u32,
}

/// `{subject, version}` pair as returned by `/schemas/ids/{id}/versions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectVersionBody {
  pub subject: String,
  pub version: u32,
}
