//! Schema bodies, subject versions, and the references between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{ContentHash, SchemaId, SchemaType, SubjectName, Version};

// ─── Schema bodies ───────────────────────────────────────────────────────────

/// An edge from a schema to a subject version it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
  /// The name the referencing schema uses for the dependency, e.g. a fully
  /// qualified Avro type name.
  pub name:    String,
  pub subject: SubjectName,
  pub version: Version,
}

/// A candidate schema as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDraft {
  pub schema_type: SchemaType,
  pub text:        String,
  pub references:  Vec<SchemaReference>,
}

impl SchemaDraft {
  pub fn new(schema_type: SchemaType, text: impl Into<String>) -> Self {
    Self { schema_type, text: text.into(), references: Vec::new() }
  }

  /// Shorthand for an Avro draft without references.
  pub fn avro(text: impl Into<String>) -> Self { Self::new(SchemaType::Avro, text) }

  pub fn with_references(mut self, references: Vec<SchemaReference>) -> Self {
    self.references = references;
    self
  }

  pub fn content_hash(&self) -> ContentHash { ContentHash::compute(&self.text) }
}

/// A stored, immutable schema body. One row exists per distinct text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
  pub id:          SchemaId,
  pub schema_type: SchemaType,
  pub text:        String,
  pub hash:        ContentHash,
  pub created_at:  DateTime<Utc>,
  /// Edges recorded for this schema, ordered by name.
  pub references:  Vec<SchemaReference>,
}

// ─── Subject versions ────────────────────────────────────────────────────────

/// One registration event: `subject` at `version` points at `schema_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectVersionRecord {
  /// Storage row id; `0` before the record is saved.
  pub id:         i64,
  pub subject:    SubjectName,
  pub version:    Version,
  pub schema_id:  SchemaId,
  pub deleted:    bool,
  pub created_at: DateTime<Utc>,
}

/// A `(subject, version)` pair, e.g. one use of a schema id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectVersionKey {
  pub subject: SubjectName,
  pub version: Version,
}
