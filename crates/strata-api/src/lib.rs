//! Confluent-compatible JSON REST API for Strata.
//!
//! Exposes an axum [`Router`] backed by any
//! [`strata_core::store::RegistryStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = strata_api::api_router(Arc::new(store));
//! axum::serve(listener, app).await?;
//! ```

pub mod compatibility;
pub mod config;
pub mod dto;
pub mod error;
pub mod mode;
pub mod schemas;
pub mod subjects;
pub mod versions;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use serde_json::{Value, json};
use strata_core::store::RegistryStore;

pub use error::ApiError;

async fn root() -> Json<Value> { Json(json!({})) }

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RegistryStore + 'static,
{
  Router::new()
    .route("/", get(root))
    .route("/contexts", get(subjects::contexts::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>))
    .route("/subjects/{subject}", post(subjects::lookup::<S>).delete(subjects::delete::<S>))
    .route(
      "/subjects/{subject}/versions",
      get(versions::list::<S>).post(versions::register::<S>),
    )
    .route(
      "/subjects/{subject}/versions/{version}",
      get(versions::get_one::<S>).delete(versions::delete::<S>),
    )
    .route("/subjects/{subject}/versions/{version}/schema", get(versions::raw_schema::<S>))
    .route(
      "/subjects/{subject}/versions/{version}/referencedby",
      get(versions::referenced_by::<S>),
    )
    // Schemas
    .route("/schemas", get(schemas::list::<S>))
    .route("/schemas/ids/{id}", get(schemas::get_one::<S>))
    .route("/schemas/ids/{id}/schema", get(schemas::raw::<S>))
    .route("/schemas/ids/{id}/versions", get(schemas::usages::<S>))
    // Config & mode
    .route("/config", get(config::get_global::<S>).put(config::put_global::<S>))
    .route(
      "/config/{subject}",
      get(config::get_subject::<S>)
        .put(config::put_subject::<S>)
        .delete(config::delete_subject::<S>),
    )
    .route("/mode", get(mode::get_global::<S>).put(mode::put_global::<S>))
    .route(
      "/mode/{subject}",
      get(mode::get_subject::<S>)
        .put(mode::put_subject::<S>)
        .delete(mode::delete_subject::<S>),
    )
    // Compatibility
    .route("/compatibility/subjects/{subject}/versions", post(compatibility::latest::<S>))
    .route(
      "/compatibility/subjects/{subject}/versions/{version}",
      post(compatibility::version::<S>),
    )
    .with_state(store)
}
