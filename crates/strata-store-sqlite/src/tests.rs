//! Integration tests for `SqliteStore` against in-memory and file databases.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use strata_avro::AvroOracle;
use strata_core::{
  compatibility::Direction,
  config::{CompatibilityLevel, GlobalConfigUpdate, Mode, SubjectConfigUpdate},
  schema::{SchemaDraft, SchemaReference, SubjectVersionRecord},
  store::{RegisterOptions, RegistryStore, SchemaIdQuery, SubjectQuery},
  value::{SchemaId, SubjectName, Version, VersionSelector},
};

use crate::{Error, Result, SqliteStore, StoreOptions};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(Arc::new(AvroOracle::new()))
    .await
    .expect("in-memory store")
}

fn subject(name: &str) -> SubjectName { SubjectName::new(name).unwrap() }

fn v(n: i64) -> Version { Version::new(n).unwrap() }

async fn register(s: &SqliteStore, name: &str, text: &str) -> Result<SubjectVersionRecord> {
  s.register_version(subject(name), SchemaDraft::avro(text), RegisterOptions::default())
    .await
}

async fn set_level(s: &SqliteStore, name: &str, level: CompatibilityLevel) {
  s.set_subject_config(
    subject(name),
    SubjectConfigUpdate { compatibility: Some(level), ..Default::default() },
    false,
  )
  .await
  .unwrap();
}

/// A distinct, always-valid schema per `n`.
fn fixed(n: usize) -> String { format!(r#"{{"type":"fixed","name":"F","size":{}}}"#, n + 1) }

const F1_STRING: &str = r#"{"type":"record","name":"R","fields":[{"name":"f1","type":"string"}]}"#;
const F1_INT: &str = r#"{"type":"record","name":"R","fields":[{"name":"f1","type":"int"}]}"#;
const F1_PLUS_OPTIONAL: &str = r#"{"type":"record","name":"R","fields":[
  {"name":"f1","type":"string"},
  {"name":"f2","type":["null","string"],"default":null}
]}"#;

const A_INT: &str = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#;
const A_LONG: &str = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"long"}]}"#;
const A_LONG_PLUS_C: &str = r#"{"type":"record","name":"R","fields":[
  {"name":"a","type":"long"},
  {"name":"c","type":"string","default":""}
]}"#;

fn registry_err<T: std::fmt::Debug>(r: Result<T>) -> strata_core::Error {
  match r {
    Err(Error::Registry(e)) => e,
    other => panic!("expected a registry error, got {other:?}"),
  }
}

// ─── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_registration_is_version_one() {
  let s = store().await;
  let rec = register(&s, "orders-value", F1_STRING).await.unwrap();
  assert_eq!(rec.version, v(1));
  assert!(!rec.deleted);
  assert!(rec.id > 0);

  let schema = s.get_schema(rec.schema_id).await.unwrap();
  assert_eq!(schema.text, F1_STRING);
  assert!(schema.references.is_empty());
}

#[tokio::test]
async fn identical_content_is_idempotent_within_subject() {
  let s = store().await;
  let first = register(&s, "a", F1_STRING).await.unwrap();
  let again = register(&s, "a", F1_STRING).await.unwrap();
  assert_eq!(first, again);
  assert_eq!(s.list_versions(subject("a"), false).await.unwrap(), vec![v(1)]);
}

#[tokio::test]
async fn same_content_shares_schema_id_across_subjects() {
  let s = store().await;
  let a = register(&s, "a", F1_STRING).await.unwrap();
  let b = register(&s, "b", F1_STRING).await.unwrap();
  assert_eq!(a.schema_id, b.schema_id);
  assert_eq!(b.version, v(1));

  let usages = s.schema_usages(a.schema_id).await.unwrap();
  let names: Vec<_> = usages.iter().map(|k| k.subject.as_str()).collect();
  assert_eq!(names, ["a", "b"]);
}

#[tokio::test]
async fn invalid_schema_is_rejected_and_nothing_is_stored() {
  let s = store().await;
  let err = registry_err(register(&s, "a", r#"{"type":"nope"}"#).await);
  assert!(matches!(err, strata_core::Error::InvalidSchema(_)));

  let all = s
    .list_schema_ids(SchemaIdQuery { include_deleted: true, ..Default::default() })
    .await
    .unwrap();
  assert!(all.is_empty());
}

#[tokio::test]
async fn normalize_flag_is_a_passthrough() {
  let s = store().await;
  let rec = s
    .register_version(
      subject("a"),
      SchemaDraft::avro(F1_STRING),
      RegisterOptions { normalize: true, ..Default::default() },
    )
    .await
    .unwrap();
  assert_eq!(s.get_schema(rec.schema_id).await.unwrap().text, F1_STRING);
}

// ─── Versions & deletes ──────────────────────────────────────────────────────

#[tokio::test]
async fn soft_deleted_content_registers_as_a_new_version() {
  let s = store().await;
  set_level(&s, "a", CompatibilityLevel::None).await;
  register(&s, "a", &fixed(1)).await.unwrap();
  let v2 = register(&s, "a", &fixed(2)).await.unwrap();
  register(&s, "a", &fixed(3)).await.unwrap();

  s.delete_version(subject("a"), v(2).into(), false).await.unwrap();
  let again = register(&s, "a", &fixed(2)).await.unwrap();
  assert_eq!(again.version, v(4));
  assert_eq!(again.schema_id, v2.schema_id);

  assert_eq!(s.list_versions(subject("a"), false).await.unwrap(), vec![v(1), v(3), v(4)]);
  assert_eq!(
    s.list_versions(subject("a"), true).await.unwrap(),
    vec![v(1), v(2), v(3), v(4)]
  );
}

#[tokio::test]
async fn versions_stay_monotonic_across_soft_deletes() {
  let s = store().await;
  set_level(&s, "a", CompatibilityLevel::None).await;
  for i in 0..3 {
    register(&s, "a", &fixed(i)).await.unwrap();
  }
  s.delete_subject(subject("a"), false).await.unwrap();
  let next = register(&s, "a", &fixed(10)).await.unwrap();
  assert_eq!(next.version, v(4));
}

#[tokio::test]
async fn soft_delete_may_be_repeated() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();
  s.delete_version(subject("a"), v(1).into(), false).await.unwrap();
  let again = s.delete_version(subject("a"), v(1).into(), false).await.unwrap();
  assert_eq!(again, v(1));
}

#[tokio::test]
async fn permanent_delete_removes_the_row() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();
  register(&s, "a", F1_PLUS_OPTIONAL).await.unwrap();
  s.delete_version(subject("a"), v(1).into(), true).await.unwrap();

  assert_eq!(s.list_versions(subject("a"), true).await.unwrap(), vec![v(2)]);
  let err = registry_err(s.get_version(subject("a"), v(1).into(), true).await);
  assert!(matches!(err, strata_core::Error::VersionNotFound { .. }));
}

#[tokio::test]
async fn delete_of_missing_targets_reports_not_found() {
  let s = store().await;
  let err = registry_err(s.delete_version(subject("ghost"), v(1).into(), false).await);
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));

  register(&s, "a", F1_STRING).await.unwrap();
  let err = registry_err(s.delete_version(subject("a"), v(7).into(), false).await);
  assert!(matches!(err, strata_core::Error::VersionNotFound { .. }));

  let err = registry_err(s.delete_subject(subject("ghost"), true).await);
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));
}

#[tokio::test]
async fn soft_delete_all_then_permanent_delete_all() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();
  register(&s, "a", F1_PLUS_OPTIONAL).await.unwrap();
  set_level(&s, "a", CompatibilityLevel::Full).await;

  let deleted = s.delete_subject(subject("a"), false).await.unwrap();
  assert_eq!(deleted, vec![v(1), v(2)]);

  // Soft-deleting an already soft-deleted subject reports every version again.
  let again = s.delete_subject(subject("a"), false).await.unwrap();
  assert_eq!(again, vec![v(1), v(2)]);
  assert!(s.list_subjects(SubjectQuery::default()).await.unwrap().is_empty());

  let purged = s.delete_subject(subject("a"), true).await.unwrap();
  assert_eq!(purged, vec![v(1), v(2)]);
  assert!(s.subject_config(subject("a")).await.unwrap().is_none());
  assert!(
    s.list_subjects(SubjectQuery { include_deleted: true, ..Default::default() })
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_version_resolves_latest_and_reports_misses() {
  let s = store().await;
  let err = registry_err(s.get_version(subject("a"), VersionSelector::Latest, false).await);
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));
  let err = registry_err(s.get_version(subject("a"), v(1).into(), false).await);
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));

  register(&s, "a", F1_STRING).await.unwrap();
  register(&s, "a", F1_PLUS_OPTIONAL).await.unwrap();
  let latest = s.get_version(subject("a"), VersionSelector::Latest, false).await.unwrap();
  assert_eq!(latest.version, v(2));

  let err = registry_err(s.get_version(subject("a"), v(3).into(), false).await);
  assert!(matches!(err, strata_core::Error::VersionNotFound { .. }));

  s.delete_version(subject("a"), v(2).into(), false).await.unwrap();
  let latest = s.get_version(subject("a"), VersionSelector::Latest, false).await.unwrap();
  assert_eq!(latest.version, v(1));
  let latest = s.get_version(subject("a"), VersionSelector::Latest, true).await.unwrap();
  assert_eq!(latest.version, v(2));
  assert!(latest.deleted);
}

#[tokio::test]
async fn list_versions_of_unknown_subject_is_not_found() {
  let s = store().await;
  let err = registry_err(s.list_versions(subject("nope"), false).await);
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));
}

#[tokio::test]
async fn lookup_distinguishes_unknown_subject_from_unknown_content() {
  let s = store().await;
  let err = registry_err(s.lookup_schema(subject("a"), SchemaDraft::avro(F1_STRING), false).await);
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));

  let rec = register(&s, "a", F1_STRING).await.unwrap();
  let found = s.lookup_schema(subject("a"), SchemaDraft::avro(F1_STRING), false).await.unwrap();
  assert_eq!(found, rec);

  let err = registry_err(s.lookup_schema(subject("a"), SchemaDraft::avro(F1_INT), false).await);
  assert!(matches!(err, strata_core::Error::SchemaNotInSubject(_)));

  s.delete_version(subject("a"), v(1).into(), false).await.unwrap();
  assert!(s.lookup_schema(subject("a"), SchemaDraft::avro(F1_STRING), false).await.is_err());
  let found = s.lookup_schema(subject("a"), SchemaDraft::avro(F1_STRING), true).await.unwrap();
  assert!(found.deleted);
}

#[tokio::test]
async fn list_subjects_filters() {
  let s = store().await;
  register(&s, "orders-value", F1_STRING).await.unwrap();
  register(&s, "orders-key", F1_STRING).await.unwrap();
  register(&s, "users-value", F1_STRING).await.unwrap();
  s.delete_subject(subject("orders-key"), false).await.unwrap();

  let names = |v: Vec<SubjectName>| v.into_iter().map(String::from).collect::<Vec<_>>();

  let active = s.list_subjects(SubjectQuery::default()).await.unwrap();
  assert_eq!(names(active), ["orders-value", "users-value"]);

  let all = s
    .list_subjects(SubjectQuery { include_deleted: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(names(all), ["orders-key", "orders-value", "users-value"]);

  let deleted = s
    .list_subjects(SubjectQuery { deleted_only: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(names(deleted), ["orders-key"]);

  let prefixed = s
    .list_subjects(SubjectQuery { prefix: Some("orders".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(names(prefixed), ["orders-value"]);
}

#[tokio::test]
async fn contexts_come_from_subject_prefixes() {
  let s = store().await;
  assert_eq!(s.list_contexts().await.unwrap().len(), 1);

  register(&s, ":.tenant1.:orders", F1_STRING).await.unwrap();
  register(&s, "plain", F1_STRING).await.unwrap();
  let contexts: Vec<String> =
    s.list_contexts().await.unwrap().into_iter().map(String::from).collect();
  assert_eq!(contexts, [".", ":.tenant1.:"]);
}

#[tokio::test]
async fn schema_ids_filter_by_activity_and_prefix() {
  let s = store().await;
  let a = register(&s, "orders-value", &fixed(1)).await.unwrap();
  let b = register(&s, "users-value", &fixed(2)).await.unwrap();
  let c = register(&s, "users-key", &fixed(3)).await.unwrap();
  s.delete_subject(subject("users-key"), false).await.unwrap();

  let active = s.list_schema_ids(SchemaIdQuery::default()).await.unwrap();
  assert_eq!(active, vec![a.schema_id, b.schema_id]);

  let every = s
    .list_schema_ids(SchemaIdQuery { include_deleted: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(every, vec![a.schema_id, b.schema_id, c.schema_id]);

  let users = s
    .list_schema_ids(SchemaIdQuery {
      subject_prefix: Some("users".into()),
      include_deleted: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(users, vec![b.schema_id, c.schema_id]);

  let page = s
    .list_schema_ids(SchemaIdQuery { include_deleted: true, limit: 1, offset: 1, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page, vec![b.schema_id]);
}

#[tokio::test]
async fn missing_schema_is_not_found() {
  let s = store().await;
  let id = SchemaId::new(42).unwrap();
  let err = registry_err(s.get_schema(id).await);
  assert!(matches!(err, strata_core::Error::SchemaNotFound(x) if x == id));
  assert!(s.schema_usages(id).await.is_err());
}

// ─── Compatibility ───────────────────────────────────────────────────────────

#[tokio::test]
async fn backward_rejects_type_change_and_accepts_defaulted_field() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();

  let err = registry_err(register(&s, "a", F1_INT).await);
  let strata_core::Error::IncompatibleSchema { level, violations, .. } = err else {
    panic!("expected IncompatibleSchema");
  };
  assert_eq!(level, CompatibilityLevel::Backward);
  assert_eq!(violations.len(), 1);
  assert_eq!(violations[0].direction, Direction::Backward);
  assert_eq!(violations[0].version, v(1));

  let ok = register(&s, "a", F1_PLUS_OPTIONAL).await.unwrap();
  assert_eq!(ok.version, v(2));
}

#[tokio::test]
async fn transitive_levels_check_the_whole_history() {
  let s = store().await;
  set_level(&s, "a", CompatibilityLevel::None).await;
  register(&s, "a", A_INT).await.unwrap();
  register(&s, "a", A_LONG).await.unwrap();

  set_level(&s, "a", CompatibilityLevel::FullTransitive).await;
  let err = registry_err(register(&s, "a", A_LONG_PLUS_C).await);
  let strata_core::Error::IncompatibleSchema { violations, .. } = err else {
    panic!("expected IncompatibleSchema");
  };
  assert_eq!(violations.len(), 1);
  assert_eq!(violations[0].direction, Direction::Forward);
  assert_eq!(violations[0].version, v(1));

  set_level(&s, "a", CompatibilityLevel::Full).await;
  let ok = register(&s, "a", A_LONG_PLUS_C).await.unwrap();
  assert_eq!(ok.version, v(3));
}

#[tokio::test]
async fn rejected_registration_keeps_the_schema_body() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();
  assert!(register(&s, "a", F1_INT).await.is_err());

  let active = s.list_schema_ids(SchemaIdQuery::default()).await.unwrap();
  let every = s
    .list_schema_ids(SchemaIdQuery { include_deleted: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(every.len(), 2);
  assert!(s.schema_usages(every[1]).await.unwrap().is_empty());
  assert_eq!(s.list_versions(subject("a"), true).await.unwrap(), vec![v(1)]);
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();

  let bad = s
    .test_compatibility(subject("a"), VersionSelector::Latest, SchemaDraft::avro(F1_INT))
    .await
    .unwrap();
  assert!(!bad.is_compatible);
  assert_eq!(bad.level, CompatibilityLevel::Backward);
  assert_eq!(bad.messages.len(), 1);

  let good = s
    .test_compatibility(subject("a"), v(1).into(), SchemaDraft::avro(F1_PLUS_OPTIONAL))
    .await
    .unwrap();
  assert!(good.is_compatible);
  assert!(good.messages.is_empty());

  assert_eq!(s.list_versions(subject("a"), true).await.unwrap(), vec![v(1)]);

  let err = registry_err(
    s.test_compatibility(subject("nope"), VersionSelector::Latest, SchemaDraft::avro(F1_INT))
      .await,
  );
  assert!(matches!(err, strata_core::Error::SubjectNotFound(_)));
}

#[tokio::test]
async fn dry_run_ignores_versions_above_the_target() {
  let s = store().await;
  set_level(&s, "a", CompatibilityLevel::None).await;
  register(&s, "a", F1_STRING).await.unwrap();
  register(&s, "a", F1_INT).await.unwrap();
  set_level(&s, "a", CompatibilityLevel::Backward).await;

  let against_v1 = s
    .test_compatibility(subject("a"), v(1).into(), SchemaDraft::avro(F1_PLUS_OPTIONAL))
    .await
    .unwrap();
  assert!(against_v1.is_compatible);

  let against_latest = s
    .test_compatibility(subject("a"), VersionSelector::Latest, SchemaDraft::avro(F1_PLUS_OPTIONAL))
    .await
    .unwrap();
  assert!(!against_latest.is_compatible);
}

// ─── Configuration & modes ───────────────────────────────────────────────────

#[tokio::test]
async fn config_inherits_from_global_until_overridden() {
  let s = store().await;
  let a = subject("a");
  assert_eq!(s.effective_compatibility(a.clone()).await.unwrap(), CompatibilityLevel::Backward);
  assert_eq!(s.effective_mode(a.clone()).await.unwrap(), Mode::ReadWrite);
  assert!(s.global_config().await.unwrap().updated_at.is_none());

  s.set_global_config(
    GlobalConfigUpdate { compatibility: Some(CompatibilityLevel::Full), mode: None },
    false,
  )
  .await
  .unwrap();
  assert_eq!(s.effective_compatibility(a.clone()).await.unwrap(), CompatibilityLevel::Full);

  set_level(&s, "a", CompatibilityLevel::None).await;
  assert_eq!(s.effective_compatibility(a.clone()).await.unwrap(), CompatibilityLevel::None);

  s.delete_subject_config(a.clone()).await.unwrap();
  assert_eq!(s.effective_compatibility(a).await.unwrap(), CompatibilityLevel::Full);

  let global = s.global_config().await.unwrap();
  assert_eq!(global.mode, Mode::ReadWrite);
  assert!(global.updated_at.is_some());
}

#[tokio::test]
async fn partial_subject_update_keeps_other_fields() {
  let s = store().await;
  let a = subject("a");
  s.set_subject_config(
    a.clone(),
    SubjectConfigUpdate {
      compatibility: Some(CompatibilityLevel::Forward),
      alias: Some("b".into()),
      normalize: Some(true),
      ..Default::default()
    },
    false,
  )
  .await
  .unwrap();
  let cfg = s
    .set_subject_config(
      a.clone(),
      SubjectConfigUpdate { mode: Some(Mode::ReadOnly), ..Default::default() },
      false,
    )
    .await
    .unwrap();
  assert_eq!(cfg.compatibility, Some(CompatibilityLevel::Forward));
  assert_eq!(cfg.mode, Some(Mode::ReadOnly));
  assert_eq!(cfg.alias.as_deref(), Some("b"));
  assert!(cfg.normalize);

  s.clear_subject_mode(a.clone()).await.unwrap();
  let cfg = s.subject_config(a).await.unwrap().unwrap();
  assert_eq!(cfg.mode, None);
  assert_eq!(cfg.compatibility, Some(CompatibilityLevel::Forward));
}

#[tokio::test]
async fn read_only_mode_blocks_writes() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();
  s.set_global_config(GlobalConfigUpdate { mode: Some(Mode::ReadOnly), ..Default::default() }, false)
    .await
    .unwrap();

  let err = registry_err(register(&s, "a", F1_PLUS_OPTIONAL).await);
  assert!(matches!(err, strata_core::Error::WriteNotAllowed { mode: Mode::ReadOnly, .. }));
  // The mode gate comes before compatibility, even for an incompatible body.
  let err = registry_err(register(&s, "a", F1_INT).await);
  assert!(matches!(err, strata_core::Error::WriteNotAllowed { mode: Mode::ReadOnly, .. }));
  let err = registry_err(s.delete_version(subject("a"), v(1).into(), false).await);
  assert!(matches!(err, strata_core::Error::WriteNotAllowed { .. }));

  // A subject override reopens writes for that subject only.
  s.set_subject_config(
    subject("a"),
    SubjectConfigUpdate { mode: Some(Mode::ReadWrite), ..Default::default() },
    false,
  )
  .await
  .unwrap();
  assert_eq!(register(&s, "a", F1_PLUS_OPTIONAL).await.unwrap().version, v(2));
  assert!(register(&s, "b", F1_STRING).await.is_err());
}

#[tokio::test]
async fn entering_import_with_active_versions_needs_force() {
  let s = store().await;
  register(&s, "a", F1_STRING).await.unwrap();
  let import = GlobalConfigUpdate { mode: Some(Mode::Import), ..Default::default() };

  let err = registry_err(s.set_global_config(import.clone(), false).await);
  assert!(matches!(err, strata_core::Error::ModeTransition(_)));
  let err = registry_err(
    s.set_subject_config(
      subject("a"),
      SubjectConfigUpdate { mode: Some(Mode::Import), ..Default::default() },
      false,
    )
    .await,
  );
  assert!(matches!(err, strata_core::Error::ModeTransition(_)));

  // Subjects without active versions may switch freely.
  s.set_subject_config(
    subject("fresh"),
    SubjectConfigUpdate { mode: Some(Mode::Import), ..Default::default() },
    false,
  )
  .await
  .unwrap();

  let cfg = s.set_global_config(import, true).await.unwrap();
  assert_eq!(cfg.mode, Mode::Import);
}

#[tokio::test]
async fn import_mode_honours_explicit_ids_and_skips_checks() {
  let s = store().await;
  s.set_global_config(GlobalConfigUpdate { mode: Some(Mode::Import), ..Default::default() }, false)
    .await
    .unwrap();

  let id = SchemaId::new(100).unwrap();
  let opts = RegisterOptions { explicit_id: Some(id), ..Default::default() };

  let rec = s.register_version(subject("a"), SchemaDraft::avro(F1_STRING), opts).await.unwrap();
  assert_eq!(rec.schema_id, id);

  // Incompatible under BACKWARD, but IMPORT skips the check.
  let rec = s
    .register_version(subject("a"), SchemaDraft::avro(F1_INT), RegisterOptions::default())
    .await
    .unwrap();
  assert_eq!(rec.version, v(2));
  assert_eq!(rec.schema_id.get(), 101);

  let err = registry_err(s.register_version(subject("b"), SchemaDraft::avro(F1_PLUS_OPTIONAL), opts).await);
  assert!(matches!(err, strata_core::Error::SchemaIdConflict(x) if x == id));
}

#[tokio::test]
async fn explicit_id_is_ignored_outside_import_mode() {
  let s = store().await;
  let opts = RegisterOptions { explicit_id: Some(SchemaId::new(500).unwrap()), ..Default::default() };
  let rec = s.register_version(subject("a"), SchemaDraft::avro(F1_STRING), opts).await.unwrap();
  assert_eq!(rec.schema_id.get(), 1);
}

#[tokio::test]
async fn store_defaults_apply_until_global_row_exists() {
  let options = StoreOptions {
    defaults: strata_core::config::GlobalConfig {
      compatibility: CompatibilityLevel::None,
      ..Default::default()
    },
    ..Default::default()
  };
  let dir = tempfile::tempdir().unwrap();
  let s = SqliteStore::open_with(dir.path().join("r.db"), Arc::new(AvroOracle::new()), options)
    .await
    .unwrap();

  register(&s, "a", F1_STRING).await.unwrap();
  assert_eq!(register(&s, "a", F1_INT).await.unwrap().version, v(2));
}

// ─── References ──────────────────────────────────────────────────────────────

const ADDRESS: &str = r#"{"type":"record","name":"Address","fields":[{"name":"city","type":"string"}]}"#;
const ORDER: &str =
  r#"{"type":"record","name":"Order","fields":[{"name":"ship_to","type":"Address"}]}"#;

fn address_ref(version: i64) -> SchemaReference {
  SchemaReference { name: "Address".into(), subject: subject("address"), version: v(version) }
}

#[tokio::test]
async fn references_are_validated_recorded_and_indexed() {
  let s = store().await;
  register(&s, "address", ADDRESS).await.unwrap();

  let draft = SchemaDraft::avro(ORDER).with_references(vec![address_ref(1)]);
  let rec = s
    .register_version(subject("order"), draft, RegisterOptions::default())
    .await
    .unwrap();

  let schema = s.get_schema(rec.schema_id).await.unwrap();
  assert_eq!(schema.references, vec![address_ref(1)]);

  let users = s
    .referencing_schema_ids(subject("address"), VersionSelector::Latest)
    .await
    .unwrap();
  assert_eq!(users, vec![rec.schema_id]);
}

#[tokio::test]
async fn unresolved_reference_is_rejected() {
  let s = store().await;
  register(&s, "address", ADDRESS).await.unwrap();

  let draft = SchemaDraft::avro(ORDER).with_references(vec![address_ref(9)]);
  let err = registry_err(
    s.register_version(subject("order"), draft, RegisterOptions::default()).await,
  );
  let strata_core::Error::InvalidReference(problems) = err else {
    panic!("expected InvalidReference");
  };
  assert_eq!(problems.len(), 1);
  assert!(problems[0].contains("Address"));
}

#[tokio::test]
async fn soft_deleted_reference_target_still_resolves() {
  let s = store().await;
  register(&s, "address", ADDRESS).await.unwrap();
  s.delete_version(subject("address"), v(1).into(), false).await.unwrap();

  let draft = SchemaDraft::avro(ORDER).with_references(vec![address_ref(1)]);
  assert!(s.register_version(subject("order"), draft, RegisterOptions::default()).await.is_ok());
}

const ORDER_WITH_NOTE: &str = r#"{"type":"record","name":"Order","fields":[
  {"name":"ship_to","type":"Address"},
  {"name":"note","type":["null","string"],"default":null}
]}"#;
const ADDRESS_INT_CITY: &str =
  r#"{"type":"record","name":"Address","fields":[{"name":"city","type":"int"}]}"#;

#[tokio::test]
async fn referencing_subject_can_evolve() {
  let s = store().await;
  register(&s, "address", ADDRESS).await.unwrap();
  let order = |text: &str| SchemaDraft::avro(text).with_references(vec![address_ref(1)]);

  s.register_version(subject("order"), order(ORDER), RegisterOptions::default())
    .await
    .unwrap();
  let report = s
    .test_compatibility(subject("order"), VersionSelector::Latest, order(ORDER_WITH_NOTE))
    .await
    .unwrap();
  assert!(report.is_compatible, "{:?}", report.messages);

  let rec = s
    .register_version(subject("order"), order(ORDER_WITH_NOTE), RegisterOptions::default())
    .await
    .unwrap();
  assert_eq!(rec.version, v(2));
}

#[tokio::test]
async fn referenced_structure_changes_are_checked() {
  let s = store().await;
  set_level(&s, "address", CompatibilityLevel::None).await;
  register(&s, "address", ADDRESS).await.unwrap();
  register(&s, "address", ADDRESS_INT_CITY).await.unwrap();

  let draft = SchemaDraft::avro(ORDER).with_references(vec![address_ref(1)]);
  s.register_version(subject("order"), draft, RegisterOptions::default()).await.unwrap();

  // The new field is optional, but the dependency now has an int city.
  let draft = SchemaDraft::avro(ORDER_WITH_NOTE).with_references(vec![address_ref(2)]);
  let err = registry_err(
    s.register_version(subject("order"), draft, RegisterOptions::default()).await,
  );
  assert!(matches!(err, strata_core::Error::IncompatibleSchema { .. }));
}

#[tokio::test]
async fn dry_run_reports_unresolved_references() {
  let s = store().await;
  register(&s, "address", ADDRESS).await.unwrap();
  let draft = SchemaDraft::avro(ORDER).with_references(vec![address_ref(1)]);
  s.register_version(subject("order"), draft, RegisterOptions::default()).await.unwrap();

  let draft = SchemaDraft::avro(ORDER).with_references(vec![address_ref(7)]);
  let err = registry_err(
    s.test_compatibility(subject("order"), VersionSelector::Latest, draft).await,
  );
  assert!(matches!(err, strata_core::Error::InvalidReference(_)));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

async fn register_concurrently(stores: &[SqliteStore], tasks: usize) -> BTreeSet<u32> {
  let handles: Vec<_> = (0..tasks)
    .map(|i| {
      let s = stores[i % stores.len()].clone();
      tokio::spawn(async move { register(&s, "hot", &fixed(i)).await })
    })
    .collect();

  let mut versions = BTreeSet::new();
  for h in handles {
    let rec = h.await.unwrap().unwrap();
    assert!(versions.insert(rec.version.get()), "duplicate version {}", rec.version);
  }
  versions
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_get_distinct_consecutive_versions() {
  for tasks in [1, 2, 10, 50] {
    let s = store().await;
    set_level(&s, "hot", CompatibilityLevel::None).await;
    let versions = register_concurrently(&[s], tasks).await;
    let expected: BTreeSet<u32> = (1..=tasks as u32).collect();
    assert_eq!(versions, expected, "with {tasks} tasks");
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_connections_share_one_version_sequence() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("registry.db");
  let a = SqliteStore::open(&path, Arc::new(AvroOracle::new())).await.unwrap();
  let b = SqliteStore::open(&path, Arc::new(AvroOracle::new())).await.unwrap();
  set_level(&a, "hot", CompatibilityLevel::None).await;

  let versions = register_concurrently(&[a.clone(), b.clone()], 50).await;
  assert_eq!(versions, (1..=50).collect::<BTreeSet<u32>>());

  let seen_by_b = b.list_versions(subject("hot"), false).await.unwrap();
  assert_eq!(seen_by_b.len(), 50);
}

// ─── Lock contention ─────────────────────────────────────────────────────────

async fn open_file(path: &std::path::Path, busy_timeout: Duration, max_attempts: u32) -> SqliteStore {
  let options = StoreOptions { busy_timeout, max_attempts, ..Default::default() };
  SqliteStore::open_with(path, Arc::new(AvroOracle::new()), options)
    .await
    .expect("file store")
}

#[tokio::test]
async fn held_write_lock_surfaces_as_transient() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("registry.db");
  let s = open_file(&path, Duration::from_millis(20), 2).await;

  let holder = rusqlite::Connection::open(&path).unwrap();
  holder.execute_batch("BEGIN IMMEDIATE").unwrap();

  let err = register(&s, "a", F1_STRING).await.unwrap_err();
  assert!(matches!(err, Error::Transient { attempts: 2 }), "{err:?}");

  holder.execute_batch("ROLLBACK").unwrap();
  assert_eq!(register(&s, "a", F1_STRING).await.unwrap().version, v(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reads_proceed_while_a_write_waits_for_the_lock() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("registry.db");
  let s = open_file(&path, Duration::from_secs(5), 1).await;
  register(&s, "a", F1_STRING).await.unwrap();

  let holder = rusqlite::Connection::open(&path).unwrap();
  holder.execute_batch("BEGIN IMMEDIATE").unwrap();

  let pending = tokio::spawn({
    let s = s.clone();
    async move { register(&s, "a", F1_PLUS_OPTIONAL).await }
  });
  // Let the registration reach SQLite's busy wait on the writer connection.
  tokio::time::sleep(Duration::from_millis(100)).await;

  let latest = tokio::time::timeout(
    Duration::from_secs(1),
    s.get_version(subject("a"), VersionSelector::Latest, false),
  )
  .await
  .expect("read queued behind the pending write")
  .unwrap();
  assert_eq!(latest.version, v(1));
  assert!(!pending.is_finished());

  holder.execute_batch("COMMIT").unwrap();
  assert_eq!(pending.await.unwrap().unwrap().version, v(2));
}
