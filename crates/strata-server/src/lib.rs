//! Strata server: configuration and HTTP application assembly.
//!
//! The binary in `main.rs` reads a [`ServerConfig`], opens a
//! [`SqliteStore`], and serves [`app`].

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use serde::Deserialize;
use strata_core::config::{CompatibilityLevel, GlobalConfig, Mode};
use strata_store_sqlite::{SqliteStore, StoreOptions};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STRATA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Global compatibility level used until one is set through the API.
  pub compatibility:   Option<CompatibilityLevel>,
  /// Global mode used until one is set through the API.
  pub mode:            Option<Mode>,
  pub busy_timeout_ms: u64,
  pub max_attempts:    u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let store = StoreOptions::default();
    Self {
      host:            "127.0.0.1".to_string(),
      port:            8081,
      store_path:      PathBuf::from("strata.db"),
      compatibility:   None,
      mode:            None,
      busy_timeout_ms: store.busy_timeout.as_millis() as u64,
      max_attempts:    store.max_attempts,
    }
  }
}

impl ServerConfig {
  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      busy_timeout: Duration::from_millis(self.busy_timeout_ms),
      max_attempts: self.max_attempts.max(1),
      defaults:     GlobalConfig {
        compatibility: self.compatibility.unwrap_or_default(),
        mode:          self.mode.unwrap_or_default(),
        updated_at:    None,
      },
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The REST API over `store`, with request tracing.
pub fn app(store: SqliteStore) -> Router {
  strata_api::api_router(Arc::new(store)).layer(TraceLayer::new_for_http())
}
