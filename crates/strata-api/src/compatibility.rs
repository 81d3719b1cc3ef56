//! Dry-run compatibility checks.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/compatibility/subjects/{subject}/versions` | Against the latest version |
//! | `POST` | `/compatibility/subjects/{subject}/versions/{version}` | `?verbose=` adds `messages` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use strata_core::{
  store::RegistryStore,
  value::{SubjectName, VersionSelector},
};

use crate::{dto::SchemaBody, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckParams {
  pub verbose: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
  pub is_compatible: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub messages:      Option<Vec<String>>,
}

async fn check<S: RegistryStore>(
  store: &S,
  subject: SubjectName,
  selector: VersionSelector,
  verbose: bool,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
  let Json(body) = body?;
  let (draft, _) = body.into_draft()?;
  let report = store
    .test_compatibility(subject, selector, draft)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(CheckResponse {
    is_compatible: report.is_compatible,
    messages:      verbose.then_some(report.messages),
  }))
}

/// `POST /compatibility/subjects/{subject}/versions`
pub async fn latest<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  Query(params): Query<CheckParams>,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  check(store.as_ref(), subject, VersionSelector::Latest, params.verbose, body).await
}

/// `POST /compatibility/subjects/{subject}/versions/{version}`
pub async fn version<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path((subject, version)): Path<(String, String)>,
  Query(params): Query<CheckParams>,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let selector: VersionSelector = version.parse()?;
  check(store.as_ref(), subject, selector, params.verbose, body).await
}
