//! Handlers for `/config` endpoints (compatibility level and subject
//! settings).
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/config` | `{compatibilityLevel}` |
//! | `PUT`    | `/config` | Body: `{"compatibility":"FULL"}`; `compatibilityLevel` also accepted |
//! | `GET`    | `/config/{subject}` | Effective level, plus the subject's own settings |
//! | `PUT`    | `/config/{subject}` | Also accepts `alias` and `normalize` |
//! | `DELETE` | `/config/{subject}` | Returns the level now in effect |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use strata_core::{
  config::{CompatibilityLevel, GlobalConfigUpdate, SubjectConfigUpdate},
  store::RegistryStore,
  value::SubjectName,
};

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBody {
  pub compatibility:       Option<String>,
  pub compatibility_level: Option<String>,
  pub alias:               Option<String>,
  pub normalize:           Option<bool>,
}

impl ConfigBody {
  fn level(&self) -> strata_core::Result<Option<CompatibilityLevel>> {
    self
      .compatibility
      .as_deref()
      .or(self.compatibility_level.as_deref())
      .map(CompatibilityLevel::parse)
      .transpose()
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
  pub compatibility_level: CompatibilityLevel,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alias:               Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub normalize:           Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigUpdateResponse {
  pub compatibility: CompatibilityLevel,
}

// ─── Global ──────────────────────────────────────────────────────────────────

/// `GET /config`
pub async fn get_global<S: RegistryStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<ConfigResponse>, ApiError> {
  let global = store.global_config().await.map_err(ApiError::from_store)?;
  Ok(Json(ConfigResponse {
    compatibility_level: global.compatibility,
    alias:               None,
    normalize:           None,
  }))
}

/// `PUT /config`
pub async fn put_global<S: RegistryStore>(
  State(store): State<Arc<S>>,
  body: Result<Json<ConfigBody>, JsonRejection>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
  let Json(body) = body?;
  let Some(level) = body.level()? else {
    return Err(strata_core::Error::ConfigValidation("compatibility is required".into()).into());
  };
  let update = GlobalConfigUpdate { compatibility: Some(level), mode: None };
  let global = store
    .set_global_config(update, false)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ConfigUpdateResponse { compatibility: global.compatibility }))
}

// ─── Subject ─────────────────────────────────────────────────────────────────

async fn effective<S: RegistryStore>(
  store: &S,
  subject: SubjectName,
) -> Result<ConfigResponse, ApiError> {
  let own = store
    .subject_config(subject.clone())
    .await
    .map_err(ApiError::from_store)?;
  let level = store
    .effective_compatibility(subject)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ConfigResponse {
    compatibility_level: level,
    alias:               own.as_ref().and_then(|c| c.alias.clone()),
    normalize:           own.as_ref().map(|c| c.normalize).filter(|n| *n),
  })
}

/// `GET /config/{subject}`
pub async fn get_subject<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
) -> Result<Json<ConfigResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  Ok(Json(effective(store.as_ref(), subject).await?))
}

/// `PUT /config/{subject}`
pub async fn put_subject<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
  body: Result<Json<ConfigBody>, JsonRejection>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  let Json(body) = body?;
  let update = SubjectConfigUpdate {
    compatibility: body.level()?,
    mode:          None,
    alias:         body.alias,
    normalize:     body.normalize,
  };
  store
    .set_subject_config(subject.clone(), update, false)
    .await
    .map_err(ApiError::from_store)?;
  let level = store
    .effective_compatibility(subject)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ConfigUpdateResponse { compatibility: level }))
}

/// `DELETE /config/{subject}`
pub async fn delete_subject<S: RegistryStore>(
  State(store): State<Arc<S>>,
  Path(subject): Path<String>,
) -> Result<Json<ConfigResponse>, ApiError> {
  let subject = SubjectName::new(subject)?;
  store
    .delete_subject_config(subject.clone())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(effective(store.as_ref(), subject).await?))
}
