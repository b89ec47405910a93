//! JSON API for Vigil's status reporter.
//!
//! Exposes an axum [`Router`] backed by any [`vigil_core::store::AlertStore`].
//! TLS, auth and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vigil_api::api_router(store.clone()))
//! ```

pub mod describe;
pub mod error;
pub mod params;

use std::sync::Arc;

use axum::{Router, routing::get};
use vigil_core::store::AlertStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AlertStore + 'static,
{
  Router::new()
    .route("/alert_details", get(describe::alert_details::<S>))
    .route("/alert_status", get(describe::alert_status::<S>))
    .route("/alerts", get(describe::alerts_by_name::<S>))
    .with_state(store)
}
