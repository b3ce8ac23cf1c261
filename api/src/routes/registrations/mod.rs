use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use util::state::AppState;

mod common;
mod get;
mod post;

pub use get::{check_registration_status, get_event_registrations, get_my_registrations};
pub use post::{register_for_event, unregister_from_event};

use crate::auth::guards::allow_faculty;

pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_for_event))
        .route("/unregister", post(unregister_from_event))
        .route("/my-registrations", get(get_my_registrations))
        .route("/status/{event_id}", get(check_registration_status))
        .route(
            "/event/{event_id}",
            get(get_event_registrations).route_layer(from_fn(allow_faculty)),
        )
}
