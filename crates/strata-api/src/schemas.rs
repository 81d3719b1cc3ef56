//! Handlers for `/schemas` endpoints, addressing bodies by global id.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schemas` | Ids; `?subjectPrefix=`, `?deleted=`, `?limit=`, `?offset=` |
//! | `GET`  | `/schemas/ids/{id}` | `{schema, schemaType?, references?}` |
//! | `GET`  | `/schemas/ids/{id}/schema` | Raw text |
//! | `GET`  | `/schemas/ids/{id}/versions` | `[{subject, version}]` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use strata_core::{
  store::{RegistryStore, SchemaIdQuery},
  value::SchemaId,
};

use crate::{
  dto::{SchemaResponse, SubjectVersionBody},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListParams {
  pub subject_prefix: Option<String>,
  pub deleted:        bool,
  pub limit:          usize,
  pub offset:         usize,
}

impl Default for ListParams {
  fn default() -> Self {
    let q = SchemaIdQuery::default();
    Self { subject_prefix: None, deleted: false, limit: q.limit, offset: q.offset }
  }
}

/// `GET /schemas`
pub async fn list<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<u32>>, ApiError> {
  let query = SchemaIdQuery {
    subject_prefix:  params.subject_prefix,
    include_deleted: params.deleted,
    limit:           params.limit,
    offset:          params.offset,
  };
  let ids = store.list_schema_ids(query).await.map_err(ApiError::from_store)?;
  Ok(Json(ids.into_iter().map(|id| id.get()).collect()))
}

/// `GET /schemas/ids/{id}`
pub async fn get_one<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<SchemaResponse>, ApiError> {
  let schema = store.get_schema(SchemaId::new(id)?).await.map_err(ApiError::from_store)?;
  Ok(Json(schema.into()))
}

/// `GET /schemas/ids/{id}/schema`
pub async fn raw<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<String, ApiError> {
  let schema = store.get_schema(SchemaId::new(id)?).await.map_err(ApiError::from_store)?;
  Ok(schema.text)
}

/// `GET /schemas/ids/{id}/versions`
pub async fn usages<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<SubjectVersionBody>>, ApiError> {
  let keys = store.schema_usages(SchemaId::new(id)?).await.map_err(ApiError::from_store)?;
  Ok(Json(
    keys
      .into_iter()
      .map(|k| SubjectVersionBody { subject: k.subject.into(), version: k.version.get() })
      .collect(),
  ))
}
