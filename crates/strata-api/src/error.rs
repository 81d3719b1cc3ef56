//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as a Confluent-style body:
//! `{"error_code": <int>, "message": "<text>"}`.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use strata_core::StoreError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Registry(#[from] strata_core::Error),

  /// The request body could not be decoded.
  #[error("{message}")]
  Body { status: StatusCode, message: String },

  /// The store gave up on a lock conflict; resubmitting may succeed.
  #[error("{0}")]
  Transient(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: registry outcomes surface verbatim, lock
  /// exhaustion is transient, anything else is internal.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    if let Some(registry) = e.registry_error() {
      return Self::Registry(registry.clone());
    }
    if e.is_transient() {
      return Self::Transient(e.to_string());
    }
    Self::Store(Box::new(e))
  }

  /// HTTP status and Confluent `error_code` for this error.
  pub fn status_and_code(&self) -> (StatusCode, u16) {
    use strata_core::Error as E;
    match self {
      Self::Registry(e) => match e {
        E::SubjectNotFound(_) => (StatusCode::NOT_FOUND, 40401),
        E::VersionNotFound { .. } => (StatusCode::NOT_FOUND, 40402),
        E::SchemaNotFound(_) | E::SchemaNotInSubject(_) => (StatusCode::NOT_FOUND, 40403),
        E::InvalidSchema(_) | E::InvalidValue(_) => (StatusCode::UNPROCESSABLE_ENTITY, 42201),
        E::InvalidReference(_) => (StatusCode::UNPROCESSABLE_ENTITY, 42202),
        E::ConfigValidation(_) => (StatusCode::UNPROCESSABLE_ENTITY, 42203),
        E::WriteNotAllowed { .. } => (StatusCode::UNPROCESSABLE_ENTITY, 42205),
        E::ModeTransition(_) => (StatusCode::CONFLICT, 42205),
        E::IncompatibleSchema { .. } => (StatusCode::CONFLICT, 409),
        E::SchemaIdConflict(_) => (StatusCode::CONFLICT, 40901),
      },
      Self::Body { status, .. } => (*status, status.as_u16()),
      Self::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, 50002),
      Self::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, 50001),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Body { status: rejection.status(), message: rejection.body_text() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    let message = match &self {
      Self::Store(e) => {
        tracing::error!(error = %e, "internal store failure");
        format!("Internal server error: {e}")
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "error_code": code, "message": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use strata_core::value::SubjectName;

  use super::*;

  #[test]
  fn registry_errors_map_to_confluent_codes() {
    let subject = SubjectName::new("s").unwrap();
    let cases = [
      (strata_core::Error::SubjectNotFound(subject.clone()), 404, 40401),
      (strata_core::Error::InvalidSchema("x".into()), 422, 42201),
      (strata_core::Error::InvalidReference(vec![]), 422, 42202),
      (strata_core::Error::ConfigValidation("x".into()), 422, 42203),
      (strata_core::Error::ModeTransition("x".into()), 409, 42205),
      (
        strata_core::Error::WriteNotAllowed { subject, mode: strata_core::config::Mode::ReadOnly },
        422,
        42205,
      ),
    ];
    for (err, status, code) in cases {
      let (s, c) = ApiError::from(err).status_and_code();
      assert_eq!((s.as_u16(), c), (status, code));
    }
  }

  #[test]
  fn transient_is_service_unavailable() {
    let (s, c) = ApiError::Transient("busy".into()).status_and_code();
    assert_eq!((s, c), (StatusCode::SERVICE_UNAVAILABLE, 50002));
  }

  #[test]
  fn store_busy_error_maps_to_service_unavailable() {
    let err = ApiError::from_store(strata_store_sqlite::Error::Transient { attempts: 2 });
    assert!(matches!(err, ApiError::Transient(_)));
    let (s, c) = err.status_and_code();
    assert_eq!((s, c), (StatusCode::SERVICE_UNAVAILABLE, 50002));
  }
}
