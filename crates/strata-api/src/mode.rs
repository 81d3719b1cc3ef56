//! Handlers for `/mode` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/mode` | `{mode}` |
//! | `PUT`    | `/mode` | Body: `{"mode":"READONLY"}`, `?force=` |
//! | `GET`    | `/mode/{subject}` | Effective mode |
//! | `PUT`    | `/mode/{subject}` | `?force=` |
//! | `DELETE` | `/mode/{subject}` | Drops the override; returns the mode now in effect |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use strata_core::{
  config::{GlobalConfigUpdate, Mode, SubjectConfigUpdate},
  store::RegistryStore,
  value::SubjectName,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ModeBody {
  pub mode: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeResponse {
  pub mode: Mode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForceParams {
  pub force: bool,
}

/// `GET /mode`
pub async fn get_global<S: RegistryStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<ModeResponse>, ApiError> {
  let global = store.global_config().await.map_err(ApiError::from_store)?;
  Ok(Json(ModeResponse { mode: global.mode }))
}

/// `PUT /mode`
pub async fn put_global<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ForceParams>,
  body: Result<Json<ModeBody>, JsonRejection>,
) -> Result<Json<ModeResponse>, ApiError> {
  let Json(body) = body?;
  let update = GlobalConfigUpdate { compatibility: None, mode: Some(Mode::parse(&body.mode)?) };
  let global = store
    .set_global_config(update, params.force)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ModeResponse { mode: global.mode }))
}

/// `GET /mode/{subject}`
pub async fn get_subject<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
) -> Result<Json<ModeResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let mode = store.effective_mode(subject).await.map_err(ApiError::from_store)?;
  Ok(Json(ModeResponse { mode }))
}

/// `PUT /mode/{subject}`
pub async fn put_subject<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  Query(params): Query<ForceParams>,
  body: Result<Json<ModeBody>, JsonRejection>,
) -> Result<Json<ModeResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let Json(body) = body?;
  let update = SubjectConfigUpdate { mode: Some(Mode::parse(&body.mode)?), ..Default::default() };
  let config = store
    .set_subject_config(subject, update, params.force)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ModeResponse { mode: config.mode.unwrap_or_default() }))
}

/// `DELETE /mode/{subject}`
pub async fn delete_subject<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
) -> Result<Json<ModeResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  store
    .clear_subject_mode(subject.clone())
    .await
    .map_err(ApiError::from_store)?;
  let mode = store.effective_mode(subject).await.map_err(ApiError::from_store)?;
  Ok(Json(ModeResponse { mode }))
}
