//! HTTP application wiring (Axum router + collaborator wiring).
//!
//! - `services.rs`: store wiring (in-memory or Postgres) into a `GateState`
//! - `routes.rs`: gated routes, each declaring its logical page and capability

use axum::{Router, routing::get};

use crate::middleware::GateState;

pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: GateState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .merge(routes::router(&state))
}
