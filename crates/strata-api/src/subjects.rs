//! Handlers for subject-level endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contexts` | Always contains `.` |
//! | `GET`    | `/subjects` | `?subjectPrefix=`, `?deleted=`, `?deletedOnly=` |
//! | `POST`   | `/subjects/{subject}` | Lookup by content, `?deleted=` |
//! | `DELETE` | `/subjects/{subject}` | `?permanent=`; returns the affected versions |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use strata_core::{
  store::{RegistryStore, SubjectQuery},
  value::SubjectName,
};

use crate::{
  dto::{SchemaBody, VersionResponse},
  error::ApiError,
};

// ─── Contexts ────────────────────────────────────────────────────────────────

/// `GET /contexts`
pub async fn contexts<S: RegistryStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<String>>, ApiError> {
  let contexts = store.list_contexts().await.map_err(ApiError::from_store)?;
  Ok(Json(contexts.into_iter().map(String::from).collect()))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListParams {
  pub subject_prefix: Option<String>,
  pub deleted:        bool,
  pub deleted_only:   bool,
}

/// `GET /subjects`
pub async fn list<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<String>>, ApiError> {
  let query = SubjectQuery {
    prefix:          params.subject_prefix,
    include_deleted: params.deleted,
    deleted_only:    params.deleted_only,
  };
  let subjects = store.list_subjects(query).await.map_err(ApiError::from_store)?;
  Ok(Json(subjects.into_iter().map(String::from).collect()))
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LookupParams {
  pub deleted: bool,
}

/// `POST /subjects/{subject}`: find the version holding this exact content.
pub async fn lookup<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  Query(params): Query<LookupParams>,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<VersionResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let Json(body) = body?;
  let (draft, _) = body.into_draft()?;
  let record = store
    .lookup_schema(subject, draft, params.deleted)
    .await
    .map_err(ApiError::from_store)?;
  let schema = store.get_schema(record.schema_id).await.map_err(ApiError::from_store)?;
  Ok(Json(VersionResponse::new(&record, schema)))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteParams {
  pub permanent: bool,
}

/// `DELETE /subjects/{subject}`
pub async fn delete<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<Vec<u32>>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let versions = store
    .delete_subject(subject, params.permanent)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(versions.into_iter().map(|v| v.get()).collect()))
}
