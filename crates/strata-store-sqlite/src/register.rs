//! The registration unit of work and its read-only dry run.

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use strata_core::{
  compatibility::{CompatibilityEngine, CompatibilityOracle, HistoricalSchema, SchemaText},
  config::{GlobalConfig, Mode},
  schema::{SchemaDraft, SchemaRecord, SubjectVersionRecord},
  store::{CompatibilityReport, RegisterOptions},
  value::{SubjectName, VersionSelector},
};

use crate::{config, ledger, references, schemas, Error, Result};

/// Register `draft` under `subject` in one `BEGIN IMMEDIATE` transaction.
///
/// The schema body is stored before the subject-level steps run inside a
/// savepoint. When those steps reject the draft, only the savepoint is
/// rolled back and the body stays behind as an orphan. Storage failures roll
/// back everything.
pub fn register_version(
  conn: &mut Connection,
  oracle: &dyn CompatibilityOracle,
  defaults: &GlobalConfig,
  subject: &SubjectName,
  mut draft: SchemaDraft,
  options: RegisterOptions,
) -> Result<SubjectVersionRecord> {
  let mut tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let mode = config::effective_mode(&tx, subject, defaults)?;
  if !mode.write_allowed() {
    return Err(strata_core::Error::WriteNotAllowed { subject: subject.clone(), mode }.into());
  }

  let normalize =
    options.normalize || config::subject(&tx, subject)?.is_some_and(|c| c.normalize);
  if normalize {
    draft.text = oracle.normalize(draft.schema_type, draft.text);
  }
  // Unresolved references are reported by `attach` as `InvalidReference`.
  let dependencies = references::dependency_texts(&tx, &draft.references)?;
  if references::validate(&tx, &draft.references)?.is_empty() {
    oracle
      .validate(draft.schema_type, SchemaText::with_dependencies(&draft.text, &dependencies))
      .map_err(strata_core::Error::InvalidSchema)?;
  }

  let explicit_id = options.explicit_id.filter(|_| mode.import_mode());
  let saved = schemas::register_or_get_existing(&tx, &draft, explicit_id)?;

  let outcome = {
    let sp = tx.savepoint()?;
    let attached = attach(&sp, oracle, defaults, subject, &draft, &dependencies, &saved, mode);
    if attached.is_ok() {
      sp.commit()?;
    }
    attached
  };

  match outcome {
    Ok(record) => {
      tx.commit()?;
      tracing::info!(
        subject = %subject,
        version = %record.version,
        schema_id = %record.schema_id,
        "registered schema"
      );
      Ok(record)
    }
    Err(Error::Registry(e)) => {
      tx.commit()?;
      tracing::info!(subject = %subject, schema_id = %saved.id, error = %e, "registration rejected");
      Err(e.into())
    }
    Err(e) => Err(e),
  }
}

/// Steps that run inside the savepoint: dedupe within the subject,
/// reference validation, compatibility, version assignment, persistence.
/// Compatibility runs after references resolve, since the candidate is parsed
/// together with its dependency bodies.
fn attach(
  conn: &Connection,
  oracle: &dyn CompatibilityOracle,
  defaults: &GlobalConfig,
  subject: &SubjectName,
  draft: &SchemaDraft,
  dependencies: &[String],
  saved: &SchemaRecord,
  mode: Mode,
) -> Result<SubjectVersionRecord> {
  if let Some(existing) = ledger::find_by_hash(conn, subject, &saved.hash, true)? {
    tracing::debug!(subject = %subject, version = %existing.version, "content already registered");
    return Ok(existing);
  }

  if !draft.references.is_empty() {
    let problems = references::validate(conn, &draft.references)?;
    if !problems.is_empty() {
      return Err(strata_core::Error::InvalidReference(problems).into());
    }
  }

  if !mode.import_mode() {
    let level = config::effective_compatibility(conn, subject, defaults)?;
    let history = ledger::active_history(conn, subject, None, CompatibilityEngine::scope(level))?;
    let history = with_dependencies(conn, history)?;
    let candidate = SchemaText::with_dependencies(&draft.text, dependencies);
    let violations =
      CompatibilityEngine::new(oracle).check(draft.schema_type, candidate, &history, level);
    if !violations.is_empty() {
      return Err(
        strata_core::Error::IncompatibleSchema { subject: subject.clone(), level, violations }
          .into(),
      );
    }
  }

  let version = ledger::next_version(conn, subject)?;
  let record = ledger::save(conn, SubjectVersionRecord {
    id: 0,
    subject: subject.clone(),
    version,
    schema_id: saved.id,
    deleted: false,
    created_at: Utc::now(),
  })?;
  references::record(conn, saved.id, &draft.references)?;
  Ok(record)
}

/// Evaluate `draft` against the active versions of `subject` up to and
/// including `selector`, newest first. Nothing is written.
pub fn test_compatibility(
  conn: &mut Connection,
  oracle: &dyn CompatibilityOracle,
  defaults: &GlobalConfig,
  subject: &SubjectName,
  selector: VersionSelector,
  draft: &SchemaDraft,
) -> Result<CompatibilityReport> {
  let tx = conn.transaction()?;

  let target = ledger::resolve(&tx, subject, selector, false)?;
  let problems = references::validate(&tx, &draft.references)?;
  if !problems.is_empty() {
    return Err(strata_core::Error::InvalidReference(problems).into());
  }
  let dependencies = references::dependency_texts(&tx, &draft.references)?;
  let candidate = SchemaText::with_dependencies(&draft.text, &dependencies);
  oracle
    .validate(draft.schema_type, candidate)
    .map_err(strata_core::Error::InvalidSchema)?;

  let level = config::effective_compatibility(&tx, subject, defaults)?;
  let history = ledger::active_history(&tx, subject, Some(target.version), None)?;
  let history = with_dependencies(&tx, history)?;
  let violations =
    CompatibilityEngine::new(oracle).check(draft.schema_type, candidate, &history, level);

  tracing::debug!(
    subject = %subject,
    target = %target.version,
    %level,
    violations = violations.len(),
    "compatibility dry run"
  );
  Ok(CompatibilityReport {
    is_compatible: violations.is_empty(),
    level,
    messages: violations.iter().map(ToString::to_string).collect(),
  })
}

/// Load the dependency bodies of each historical version.
fn with_dependencies(
  conn: &Connection,
  mut history: Vec<HistoricalSchema>,
) -> Result<Vec<HistoricalSchema>> {
  for prior in &mut history {
    let refs = references::for_schema(conn, prior.schema_id)?;
    prior.dependencies = references::dependency_texts(conn, &refs)?;
  }
  Ok(history)
}
