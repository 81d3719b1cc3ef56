//! SQLite backend for the Strata schema registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each registry component (schema
//! bodies, the version ledger, configuration, the reference graph) is a set
//! of synchronous functions over a `rusqlite` connection; [`SqliteStore`]
//! composes them into transactions.

mod config;
mod encode;
mod ledger;
mod references;
mod register;
mod schema;
mod schemas;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};

#[cfg(test)]
mod tests;
