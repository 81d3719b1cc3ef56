//! Avro compatibility oracle for Strata.
//!
//! Implements [`strata_core::compatibility::CompatibilityOracle`] on top of
//! the `apache-avro` crate's parser and reader/writer schema resolution.
//! Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use strata_avro::AvroOracle;
//! use strata_core::{
//!   compatibility::{CompatibilityOracle, SchemaText},
//!   value::SchemaType,
//! };
//!
//! let oracle = AvroOracle::new();
//! oracle.validate(SchemaType::Avro, SchemaText::new(r#"{"type":"string"}"#)).unwrap();
//! ```

pub mod error;
mod oracle;

pub use error::{Error, Result};
pub use oracle::AvroOracle;
