//! [`SqliteStore`]: the SQLite implementation of [`RegistryStore`].

use std::{path::Path, sync::Arc, time::Duration};

use rusqlite::{Connection, TransactionBehavior};
use strata_core::{
  compatibility::CompatibilityOracle,
  config::{
    CompatibilityLevel, GlobalConfig, GlobalConfigUpdate, Mode, SubjectConfig,
    SubjectConfigUpdate,
  },
  schema::{SchemaDraft, SchemaRecord, SubjectVersionKey, SubjectVersionRecord},
  store::{CompatibilityReport, RegisterOptions, RegistryStore, SchemaIdQuery, SubjectQuery},
  value::{Context, SchemaId, SubjectName, Version, VersionSelector},
};

use crate::{config, ledger, references, register, schema::SCHEMA, schemas, Error, Result};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection tuning and the defaults used before the global config row is
/// first written.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How long SQLite waits on a locked database before reporting busy.
  pub busy_timeout: Duration,
  /// Attempts per operation when the database stays busy, including the
  /// first.
  pub max_attempts: u32,
  pub defaults:     GlobalConfig,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      busy_timeout: Duration::from_secs(5),
      max_attempts: 5,
      defaults:     GlobalConfig::default(),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A schema registry backed by a single SQLite file.
///
/// Cloning is cheap; the connections and oracle are reference-counted.
/// File-backed stores hold two connections: writes and dry runs go through
/// `writer`, plain reads through `reader`, so a registration waiting on the
/// write lock does not hold up lookups. SQLite still admits one writer at a
/// time across every store opened on the same file.
#[derive(Clone)]
pub struct SqliteStore {
  writer:  tokio_rusqlite::Connection,
  reader:  tokio_rusqlite::Connection,
  oracle:  Arc<dyn CompatibilityOracle>,
  options: Arc<StoreOptions>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, oracle: Arc<dyn CompatibilityOracle>) -> Result<Self> {
    Self::open_with(path, oracle, StoreOptions::default()).await
  }

  pub async fn open_with(
    path: impl AsRef<Path>,
    oracle: Arc<dyn CompatibilityOracle>,
    options: StoreOptions,
  ) -> Result<Self> {
    let path = path.as_ref();
    let writer = tokio_rusqlite::Connection::open(path).await?;
    init_schema(&writer, options.busy_timeout).await?;

    let reader = tokio_rusqlite::Connection::open(path).await?;
    let busy_timeout = options.busy_timeout;
    reader
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "query_only", true)?;
        Ok(())
      })
      .await?;

    Ok(Self { writer, reader, oracle, options: Arc::new(options) })
  }

  /// Open an in-memory store; useful for testing.
  ///
  /// A second `:memory:` connection would be a separate database, so reads
  /// share the writer's connection here.
  pub async fn open_in_memory(oracle: Arc<dyn CompatibilityOracle>) -> Result<Self> {
    let options = StoreOptions::default();
    let writer = tokio_rusqlite::Connection::open_in_memory().await?;
    init_schema(&writer, options.busy_timeout).await?;
    let reader = writer.clone();
    Ok(Self { writer, reader, oracle, options: Arc::new(options) })
  }

  /// Writes go through the single writer connection.
  async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection, &Shared) -> Result<T> + Clone + Send + 'static,
    T: Send + 'static,
  {
    self.run_on(&self.writer, op, f).await
  }

  async fn read<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection, &Shared) -> Result<T> + Clone + Send + 'static,
    T: Send + 'static,
  {
    self.run_on(&self.reader, op, f).await
  }

  /// Run `f` on `conn`'s thread, retrying with backoff while the database
  /// reports `BUSY`/`LOCKED`.
  async fn run_on<T, F>(&self, conn: &tokio_rusqlite::Connection, op: &'static str, f: F) -> Result<T>
  where
    F: FnOnce(&mut Connection, &Shared) -> Result<T> + Clone + Send + 'static,
    T: Send + 'static,
  {
    let max_attempts = self.options.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      let ctx = Shared { oracle: self.oracle.clone(), options: self.options.clone() };
      let f = f.clone();
      let outcome = conn.call(move |conn| Ok(f(conn, &ctx))).await?;

      match outcome {
        Err(e) if e.is_lock_conflict() && attempt < max_attempts => {
          tracing::warn!(op, attempt, "database busy; retrying");
          tokio::time::sleep(Duration::from_millis(10 << attempt.min(6))).await;
          attempt += 1;
        }
        Err(e) if e.is_lock_conflict() => {
          tracing::warn!(op, attempts = attempt, "database busy; giving up");
          return Err(Error::Transient { attempts: attempt });
        }
        other => return other,
      }
    }
  }
}

async fn init_schema(conn: &tokio_rusqlite::Connection, busy_timeout: Duration) -> Result<()> {
  conn
    .call(move |conn| {
      conn.busy_timeout(busy_timeout)?;
      conn.execute_batch(SCHEMA)?;
      Ok(())
    })
    .await?;
  Ok(())
}

/// Shared state handed to every closure run on the connection thread.
struct Shared {
  oracle:  Arc<dyn CompatibilityOracle>,
  options: Arc<StoreOptions>,
}

impl Shared {
  fn defaults(&self) -> &GlobalConfig { &self.options.defaults }
}

/// Fail with `WriteNotAllowed` unless `subject`'s effective mode accepts
/// writes.
fn ensure_writable(conn: &Connection, subject: &SubjectName, defaults: &GlobalConfig) -> Result<()> {
  let mode = config::effective_mode(conn, subject, defaults)?;
  if mode.write_allowed() {
    Ok(())
  } else {
    Err(strata_core::Error::WriteNotAllowed { subject: subject.clone(), mode }.into())
  }
}

// ─── RegistryStore impl ──────────────────────────────────────────────────────

impl RegistryStore for SqliteStore {
  type Error = Error;

  // ── Registration ──────────────────────────────────────────────────────────

  async fn register_version(
    &self,
    subject: SubjectName,
    draft: SchemaDraft,
    options: RegisterOptions,
  ) -> Result<SubjectVersionRecord> {
    self
      .run("register_version", move |conn, ctx| {
        register::register_version(
          conn,
          ctx.oracle.as_ref(),
          ctx.defaults(),
          &subject,
          draft,
          options,
        )
      })
      .await
  }

  async fn test_compatibility(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
    draft: SchemaDraft,
  ) -> Result<CompatibilityReport> {
    self
      .read("test_compatibility", move |conn, ctx| {
        register::test_compatibility(
          conn,
          ctx.oracle.as_ref(),
          ctx.defaults(),
          &subject,
          selector,
          &draft,
        )
      })
      .await
  }

  // ── Schemas ───────────────────────────────────────────────────────────────

  async fn get_schema(&self, id: SchemaId) -> Result<SchemaRecord> {
    self.read("get_schema", move |conn, _| schemas::get(conn, id)).await
  }

  async fn list_schema_ids(&self, query: SchemaIdQuery) -> Result<Vec<SchemaId>> {
    self.read("list_schema_ids", move |conn, _| schemas::list_ids(conn, &query)).await
  }

  async fn schema_usages(&self, id: SchemaId) -> Result<Vec<SubjectVersionKey>> {
    self
      .read("schema_usages", move |conn, _| {
        let tx = conn.transaction()?;
        schemas::get(&tx, id)?;
        ledger::usages(&tx, id)
      })
      .await
  }

  async fn referencing_schema_ids(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
  ) -> Result<Vec<SchemaId>> {
    self
      .read("referencing_schema_ids", move |conn, _| {
        let tx = conn.transaction()?;
        let target = ledger::resolve(&tx, &subject, selector, false)?;
        references::referencing_schema_ids(&tx, &subject, target.version)
      })
      .await
  }

  // ── Subjects & versions ───────────────────────────────────────────────────

  async fn list_subjects(&self, query: SubjectQuery) -> Result<Vec<SubjectName>> {
    self.read("list_subjects", move |conn, _| ledger::list_subjects(conn, &query)).await
  }

  async fn list_contexts(&self) -> Result<Vec<Context>> {
    self.read("list_contexts", |conn, _| ledger::list_contexts(conn)).await
  }

  async fn list_versions(&self, subject: SubjectName, include_deleted: bool) -> Result<Vec<Version>> {
    self
      .read("list_versions", move |conn, _| {
        let versions = ledger::list_versions(conn, &subject, include_deleted)?;
        if versions.is_empty() {
          return Err(strata_core::Error::SubjectNotFound(subject).into());
        }
        Ok(versions)
      })
      .await
  }

  async fn get_version(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
    include_deleted: bool,
  ) -> Result<SubjectVersionRecord> {
    self
      .read("get_version", move |conn, _| {
        ledger::resolve(conn, &subject, selector, include_deleted)
      })
      .await
  }

  async fn lookup_schema(
    &self,
    subject: SubjectName,
    draft: SchemaDraft,
    include_deleted: bool,
  ) -> Result<SubjectVersionRecord> {
    let hash = draft.content_hash();
    self
      .read("lookup_schema", move |conn, _| {
        let tx = conn.transaction()?;
        if let Some(found) = ledger::find_by_hash(&tx, &subject, &hash, !include_deleted)? {
          return Ok(found);
        }
        let err = if ledger::has_rows(&tx, &subject)? {
          strata_core::Error::SchemaNotInSubject(subject)
        } else {
          strata_core::Error::SubjectNotFound(subject)
        };
        Err(err.into())
      })
      .await
  }

  async fn delete_version(
    &self,
    subject: SubjectName,
    selector: VersionSelector,
    permanent: bool,
  ) -> Result<Version> {
    self
      .run("delete_version", move |conn, ctx| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_writable(&tx, &subject, ctx.defaults())?;

        // `latest` addresses the newest active version for a soft delete.
        let include_deleted = permanent || selector.exact().is_some();
        let target = ledger::resolve(&tx, &subject, selector, include_deleted)?;
        if permanent {
          ledger::hard_delete(&tx, &subject, target.version)?;
        } else {
          ledger::soft_delete(&tx, &subject, target.version)?;
        }
        tx.commit()?;

        tracing::info!(subject = %subject, version = %target.version, permanent, "deleted version");
        Ok(target.version)
      })
      .await
  }

  async fn delete_subject(&self, subject: SubjectName, permanent: bool) -> Result<Vec<Version>> {
    self
      .run("delete_subject", move |conn, ctx| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_writable(&tx, &subject, ctx.defaults())?;

        // Soft deletes are idempotent: any row, deleted or not, is enough.
        let versions = ledger::list_versions(&tx, &subject, true)?;
        if versions.is_empty() {
          return Err(strata_core::Error::SubjectNotFound(subject).into());
        }
        if permanent {
          ledger::hard_delete_all(&tx, &subject)?;
          config::delete_subject(&tx, &subject)?;
        } else {
          ledger::soft_delete_all(&tx, &subject)?;
        }
        tx.commit()?;

        tracing::info!(subject = %subject, count = versions.len(), permanent, "deleted subject");
        Ok(versions)
      })
      .await
  }

  // ── Configuration ─────────────────────────────────────────────────────────

  async fn global_config(&self) -> Result<GlobalConfig> {
    self.read("global_config", |conn, ctx| config::global(conn, ctx.defaults())).await
  }

  async fn subject_config(&self, subject: SubjectName) -> Result<Option<SubjectConfig>> {
    self.read("subject_config", move |conn, _| config::subject(conn, &subject)).await
  }

  async fn effective_compatibility(&self, subject: SubjectName) -> Result<CompatibilityLevel> {
    self
      .read("effective_compatibility", move |conn, ctx| {
        config::effective_compatibility(conn, &subject, ctx.defaults())
      })
      .await
  }

  async fn effective_mode(&self, subject: SubjectName) -> Result<Mode> {
    self
      .read("effective_mode", move |conn, ctx| {
        config::effective_mode(conn, &subject, ctx.defaults())
      })
      .await
  }

  async fn set_global_config(&self, update: GlobalConfigUpdate, force: bool) -> Result<GlobalConfig> {
    self
      .run("set_global_config", move |conn, ctx| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let next = config::set_global(&tx, ctx.defaults(), &update, force)?;
        tx.commit()?;
        Ok(next)
      })
      .await
  }

  async fn set_subject_config(
    &self,
    subject: SubjectName,
    update: SubjectConfigUpdate,
    force: bool,
  ) -> Result<SubjectConfig> {
    self
      .run("set_subject_config", move |conn, ctx| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let next = config::set_subject(&tx, ctx.defaults(), &subject, &update, force)?;
        tx.commit()?;
        Ok(next)
      })
      .await
  }

  async fn delete_subject_config(&self, subject: SubjectName) -> Result<()> {
    self
      .run("delete_subject_config", move |conn, _| {
        if config::delete_subject(conn, &subject)? {
          tracing::info!(subject = %subject, "reverted subject config to global");
        }
        Ok(())
      })
      .await
  }

  async fn clear_subject_mode(&self, subject: SubjectName) -> Result<()> {
    self
      .run("clear_subject_mode", move |conn, _| config::clear_mode(conn, &subject))
      .await
  }
}
