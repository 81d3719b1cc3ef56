//! Core types and trait definitions for the Strata schema registry.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; schema formats plug in through
//! [`compatibility::CompatibilityOracle`].

pub mod compatibility;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{Error, Result, StoreError};
