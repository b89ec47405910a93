//! HTTP surface of the Vigil status reporter.
//!
//! Mounts the [`vigil_api`] router under `/api` with request tracing, backed
//! by any [`AlertStore`].

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vigil_core::store::AlertStore;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VIGIL_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       9201,
      store_path: PathBuf::from("vigil.db"),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(store: Arc<S>) -> Router
where
  S: AlertStore + 'static,
{
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", vigil_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
