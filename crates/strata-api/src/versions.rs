//! Handlers for `/subjects/{subject}/versions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects/{subject}/versions` | `?deleted=` |
//! | `POST`   | `/subjects/{subject}/versions` | Register, `?normalize=`; returns `{id}` |
//! | `GET`    | `/subjects/{subject}/versions/{version}` | `latest` or `-1` allowed |
//! | `DELETE` | `/subjects/{subject}/versions/{version}` | `?permanent=` |
//! | `GET`    | `/subjects/{subject}/versions/{version}/schema` | Raw text |
//! | `GET`    | `/subjects/{subject}/versions/{version}/referencedby` | Schema ids |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use strata_core::{
  store::{RegisterOptions, RegistryStore},
  value::{SubjectName, VersionSelector},
};

use crate::{
  dto::{IdResponse, SchemaBody, VersionResponse},
  error::ApiError,
};

fn parse_path(subject: String, version: &str) -> Result<(SubjectName, VersionSelector), ApiError> {
  Ok((SubjectName::new(subject)?, version.parse()?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeletedParams {
  pub deleted: bool,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /subjects/{subject}/versions`
pub async fn list<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  Query(params): Query<DeletedParams>,
) -> Result<Json<Vec<u32>>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let versions = store
    .list_versions(subject, params.deleted)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(versions.into_iter().map(|v| v.get()).collect()))
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterParams {
  pub normalize: bool,
}

/// `POST /subjects/{subject}/versions`
pub async fn register<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  Query(params): Query<RegisterParams>,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<IdResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let Json(body) = body?;
  let (draft, explicit_id) = body.into_draft()?;
  let options = RegisterOptions { explicit_id, normalize: params.normalize };
  let record = store
    .register_version(subject, draft, options)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(IdResponse { id: record.schema_id.get() }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /subjects/{subject}/versions/{version}`
pub async fn get_one<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path((subject, version)): Path<(String, String)>,
  Query(params): Query<DeletedParams>,
) -> Result<Json<VersionResponse>, ApiError> {
  let (subject, selector) = parse_path(subject, &version)?;
  let record = store
    .get_version(subject, selector, params.deleted)
    .await
    .map_err(ApiError::from_store)?;
  let schema = store.get_schema(record.schema_id).await.map_err(ApiError::from_store)?;
  Ok(Json(VersionResponse::new(&record, schema)))
}

/// `GET /subjects/{subject}/versions/{version}/schema`
pub async fn raw_schema<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path((subject, version)): Path<(String, String)>,
  Query(params): Query<DeletedParams>,
) -> Result<String, ApiError> {
  let (subject, selector) = parse_path(subject, &version)?;
  let record = store
    .get_version(subject, selector, params.deleted)
    .await
    .map_err(ApiError::from_store)?;
  let schema = store.get_schema(record.schema_id).await.map_err(ApiError::from_store)?;
  Ok(schema.text)
}

/// `GET /subjects/{subject}/versions/{version}/referencedby`
pub async fn referenced_by<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path((subject, version)): Path<(String, String)>,
) -> Result<Json<Vec<u32>>, ApiError> {
  let (subject, selector) = parse_path(subject, &version)?;
  let ids = store
    .referencing_schema_ids(subject, selector)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ids.into_iter().map(|id| id.get()).collect()))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteParams {
  pub permanent: bool,
}

/// `DELETE /subjects/{subject}/versions/{version}`
pub async fn delete<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path((subject, version)): Path<(String, String)>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<u32>, ApiError> {
  let (subject, selector) = parse_path(subject, &version)?;
  let deleted = store
    .delete_version(subject, selector, params.permanent)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(deleted.get()))
}
