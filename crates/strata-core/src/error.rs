//! Error types for `strata-core`.

use thiserror::Error;

use crate::{
  compatibility::Violation,
  config::{CompatibilityLevel, Mode},
  value::{SchemaId, SubjectName, Version},
};

/// Every caller-facing outcome of the registry engine other than success.
#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("Subject '{0}' not found")]
  SubjectNotFound(SubjectName),

  #[error("Version {version} not found for subject '{subject}'")]
  VersionNotFound { subject: SubjectName, version: Version },

  #[error("Schema {0} not found")]
  SchemaNotFound(SchemaId),

  /// Lookup by content under a subject that exists but never held it.
  #[error("Schema not found under subject '{0}'")]
  SchemaNotInSubject(SubjectName),

  #[error("Invalid schema: {0}")]
  InvalidSchema(String),

  #[error(
    "Schema is incompatible with subject '{subject}' (level: {level}): {}",
    join_violations(.violations)
  )]
  IncompatibleSchema {
    subject:    SubjectName,
    level:      CompatibilityLevel,
    violations: Vec<Violation>,
  },

  #[error("Invalid schema references: {}", .0.join(", "))]
  InvalidReference(Vec<String>),

  #[error("Write operations are not allowed for subject '{subject}' in {mode} mode")]
  WriteNotAllowed { subject: SubjectName, mode: Mode },

  #[error("Mode transition rejected: {0}")]
  ModeTransition(String),

  #[error("Invalid configuration value: {0}")]
  ConfigValidation(String),

  #[error("Schema id {0} is already assigned to different content")]
  SchemaIdConflict(SchemaId),

  #[error("{0}")]
  InvalidValue(String),
}

fn join_violations(violations: &[Violation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by storage backends so adapters can classify a backend error
/// without knowing its concrete type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The registry-level error carried by this failure, if any.
  fn registry_error(&self) -> Option<&Error>;

  /// `true` when the failure was a lock conflict that outlived the retry
  /// budget; the same request may succeed if resubmitted.
  fn is_transient(&self) -> bool { false }
}

impl StoreError for Error {
  fn registry_error(&self) -> Option<&Error> { Some(self) }
}
