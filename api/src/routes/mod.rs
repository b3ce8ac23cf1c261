//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe (public)
//! - `/registrations` → the registration ledger (authenticated users)
//! - `/attendance` → QR sessions, the attendance recorder, and reports
//!   (authenticated users; report routes additionally faculty-gated)
//!
//! Authentication itself belongs to the external identity gate: these
//! routes only verify and consume its bearer tokens.

use crate::auth::guards::allow_authenticated;
use crate::routes::{
    attendance::attendance_routes, health::health_routes, registrations::registration_routes,
};
use axum::{Router, middleware::from_fn};
use util::state::AppState;

pub mod attendance;
pub mod health;
pub mod registrations;

/// Builds the complete application router for all HTTP endpoints.
///
/// The returned router is fully stated and ready to nest under `/api`.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest(
            "/registrations",
            registration_routes().route_layer(from_fn(allow_authenticated)),
        )
        .nest(
            "/attendance",
            attendance_routes().route_layer(from_fn(allow_authenticated)),
        )
        .with_state(app_state)
}
