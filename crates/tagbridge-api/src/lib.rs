//! JSON HTTP surface for tagbridge.
//!
//! Exposes an axum [`Router`] over an [`AccessEngine`] and a
//! [`LocationEngine`] backed by any [`TreeStore`] and [`Geocoder`]. Static
//! assets, TLS and process lifecycle are the caller's responsibility.
//!
//! Every endpoint answers HTTP 200 with a result-shaped JSON body; upstream
//! failures render as `{"result":"error"}`, never as a 5xx with a stack
//! trace. Missing request fields are rejected before any store interaction.

pub mod access;
pub mod ping;
pub mod track;


use std::sync::Arc;

use axum::{Router, routing::get};
use tagbridge_core::{
  access::AccessEngine,
  location::{Geocoder, LocationEngine},
  store::TreeStore,
};

// ─── Service identity ─────────────────────────────────────────────────────────

/// Static identity echoed by the `/test` diagnostic endpoints.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
  pub domain: String,
  pub author: String,
}

// ─── Application state ─────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, G> {
  pub access:  Arc<AccessEngine<S>>,
  pub tracker: Arc<LocationEngine<S, G>>,
  pub info:    Arc<ServiceInfo>,
}

// Manual impl: `#[derive(Clone)]` would demand `S: Clone` and `G: Clone`.
impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      access:  Arc::clone(&self.access),
      tracker: Arc::clone(&self.tracker),
      info:    Arc::clone(&self.info),
    }
  }
}

// ─── Router ─────────────────────────────────────────────────────────────────────

/// Build the API router for the given engines.
///
/// The returned `Router<()>` can be nested or merged into any parent router
/// regardless of its own state type.
pub fn router<S, G>(state: AppState<S, G>) -> Router<()>
where
  S: TreeStore + 'static,
  G: Geocoder + 'static,
{
  Router::new()
    .route("/v1/test", get(ping::v1::<S, G>))
    .route("/v2/test", get(ping::v2::<S, G>))
    .route("/v2/access", get(access::handler::<S, G>))
    .route("/v1/track", get(track::handler::<S, G>))
    .with_state(state)
}
