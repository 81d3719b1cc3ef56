//! The `RegistryStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `strata-store-sqlite`).
//! Higher layers (`strata-api`, `strata-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  config::{CompatibilityLevel, GlobalConfig, GlobalConfigUpdate, Mode, SubjectConfig, SubjectConfigUpdate},
  error::StoreError,
  schema::{SchemaDraft, SchemaRecord, SubjectVersionKey, SubjectVersionRecord},
  value::{Context, SchemaId, SubjectName, Version, VersionSelector},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`RegistryStore::list_subjects`].
#[derive(Debug, Clone, Default)]
pub struct SubjectQuery {
  /// Only subjects whose name starts with this prefix.
  pub prefix:          Option<String>,
  /// Also return subjects whose versions are all soft-deleted.
  pub include_deleted: bool,
  /// Only return subjects with at least one soft-deleted version.
  pub deleted_only:    bool,
}

/// Parameters for [`RegistryStore::list_schema_ids`].
#[derive(Debug, Clone)]
pub struct SchemaIdQuery {
  pub subject_prefix:  Option<String>,
  pub include_deleted: bool,
  pub limit:           usize,
  pub offset:          usize,
}

impl Default for SchemaIdQuery {
  fn default() -> Self {
    Self { subject_prefix: None, include_deleted: false, limit: 100, offset: 0 }
  }
}

/// Options for [`RegistryStore::register_version`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
  /// Caller-supplied schema id; only honoured in IMPORT mode.
  pub explicit_id: Option<SchemaId>,
  /// Run the draft through the oracle's normaliser before hashing.
  pub normalize:   bool,
}

/// Result of a dry-run compatibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
  pub is_compatible: bool,
  pub level:         CompatibilityLevel,
  pub messages:      Vec<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a schema registry backend.
///
/// Schema bodies are write-once. Subject versions are appended by
/// [`register_version`](Self::register_version) and retired by the delete
/// operations; version numbers are never reused.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RegistryStore: Send + Sync {
  type Error: StoreError;

  // ── Registration ──────────────────────────────────────────────────────

  /// Register `draft` under `subject` as one atomic unit of work.
  ///
  /// Returns the existing record unchanged if identical content is already
  /// active under the subject.
  fn register_version(
    &self,
    subject: SubjectName,
    draft: SchemaDraft,
    options: RegisterOptions,
  ) -> impl Future<Output = Result<SubjectVersionRecord, Self::Error>> + Send + '_;

  /// Evaluate `draft` against the active versions of `subject` up to and
  /// including `selector`, without writing anything.
  fn test_compatibility(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
    draft: SchemaDraft,
  ) -> impl Future<Output = Result<CompatibilityReport, Self::Error>> + Send + '_;

  // ── Schemas ───────────────────────────────────────────────────────────

  fn get_schema(
    &self,
    id: SchemaId,
  ) -> impl Future<Output = Result<SchemaRecord, Self::Error>> + Send + '_;

  /// Schema ids ordered ascending, paginated.
  fn list_schema_ids(
    &self,
    query: SchemaIdQuery,
  ) -> impl Future<Output = Result<Vec<SchemaId>, Self::Error>> + Send + '_;

  /// Every subject version that points at `id`, deleted ones included.
  fn schema_usages(
    &self,
    id: SchemaId,
  ) -> impl Future<Output = Result<Vec<SubjectVersionKey>, Self::Error>> + Send + '_;

  /// Ids of schemas that declare a reference to the active version of
  /// `subject` addressed by `selector`.
  fn referencing_schema_ids(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
  ) -> impl Future<Output = Result<Vec<SchemaId>, Self::Error>> + Send + '_;

  // ── Subjects & versions ───────────────────────────────────────────────

  fn list_subjects(
    &self,
    query: SubjectQuery,
  ) -> impl Future<Output = Result<Vec<SubjectName>, Self::Error>> + Send + '_;

  /// Distinct contexts of every known subject; always includes the default.
  fn list_contexts(&self) -> impl Future<Output = Result<Vec<Context>, Self::Error>> + Send + '_;

  /// Ascending version numbers. Fails with `SubjectNotFound` when none match.
  fn list_versions(
    &self,
    subject: SubjectName,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + '_;

  fn get_version(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
    include_deleted: bool,
  ) -> impl Future<Output = Result<SubjectVersionRecord, Self::Error>> + Send + '_;

  /// Find the version of `subject` whose content hashes the same as `draft`.
  fn lookup_schema(
    &self,
    subject: SubjectName,
    draft: SchemaDraft,
    include_deleted: bool,
  ) -> impl Future<Output = Result<SubjectVersionRecord, Self::Error>> + Send + '_;

  /// Soft-delete (flag) or permanently delete one version.
  fn delete_version(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
    permanent: bool,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + '_;

  /// Soft-delete or permanently delete every version of `subject`, returning
  /// the affected version numbers.
  fn delete_subject(
    &self,
    subject: SubjectName,
    permanent: bool,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + '_;

  // ── Configuration ─────────────────────────────────────────────────────

  fn global_config(&self) -> impl Future<Output = Result<GlobalConfig, Self::Error>> + Send + '_;

  fn subject_config(
    &self,
    subject: SubjectName,
  ) -> impl Future<Output = Result<Option<SubjectConfig>, Self::Error>> + Send + '_;

  fn effective_compatibility(
    &self,
    subject: SubjectName,
  ) -> impl Future<Output = Result<CompatibilityLevel, Self::Error>> + Send + '_;

  fn effective_mode(
    &self,
    subject: SubjectName,
  ) -> impl Future<Output = Result<Mode, Self::Error>> + Send + '_;

  /// Apply a partial update to the global row. Entering IMPORT while any
  /// subject has active versions requires `force`.
  fn set_global_config(
    &self,
    update: GlobalConfigUpdate,
    force: bool,
  ) -> impl Future<Output = Result<GlobalConfig, Self::Error>> + Send + '_;

  /// Apply a partial update to a subject's overrides. Entering IMPORT while
  /// the subject has active versions requires `force`.
  fn set_subject_config(
    &self,
    subject: SubjectName,
    update: SubjectConfigUpdate,
    force: bool,
  ) -> impl Future<Output = Result<SubjectConfig, Self::Error>> + Send + '_;

  /// Drop every override for `subject`, reverting it to the global config.
  fn delete_subject_config(
    &self,
    subject: SubjectName,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Drop only the mode override for `subject`.
  fn clear_subject_mode(
    &self,
    subject: SubjectName,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
