//! Error type for `strata-avro`.

use strata_core::value::SchemaType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Parse(#[from] apache_avro::Error),

  #[error("{0} schemas are not supported")]
  Unsupported(SchemaType),

  /// The referencing body did not come back as a single field of the
  /// wrapper record.
  #[error("schema body could not be separated from its dependencies")]
  Detached,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
