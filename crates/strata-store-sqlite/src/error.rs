//! Error type for `strata-store-sqlite`.

use rusqlite::ErrorCode;
use strata_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Registry(#[from] strata_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// A stored column held a value the domain types reject.
  #[error("corrupt row: {0}")]
  Decode(String),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Lock contention outlived the retry budget.
  #[error("database is busy; gave up after {attempts} attempts")]
  Transient { attempts: u32 },
}

impl Error {
  /// `true` for `SQLITE_BUSY` / `SQLITE_LOCKED`, which are worth retrying.
  pub(crate) fn is_lock_conflict(&self) -> bool {
    let sqlite = match self {
      Self::Sqlite(e) => e,
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => e,
      _ => return false,
    };
    matches!(
      sqlite.sqlite_error_code(),
      Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
  }
}

impl StoreError for Error {
  fn registry_error(&self) -> Option<&strata_core::Error> {
    match self {
      Self::Registry(e) => Some(e),
      _ => None,
    }
  }

  fn is_transient(&self) -> bool { matches!(self, Self::Transient { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
