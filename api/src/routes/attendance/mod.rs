use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post, put},
};
use util::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use get::{
    get_all_attendance_reports, get_attendance_summary, get_event_attendance, get_own_attendance,
};
pub use post::{
    generate_qr_code, mark_attendance_batch, mark_attendance_by_qr, mark_attendance_for_other,
};
pub use put::edit_attendance;

use crate::auth::guards::allow_faculty;

pub fn attendance_routes() -> Router<AppState> {
    // Read-only reports: loose faculty gate at the router, no coordinator
    // check. Mutating routes below do the strict per-event policy check
    // inside their handlers instead.
    let reports = Router::new()
        .route("/event/{event_id}", get(get_event_attendance))
        .route("/reports", get(get_all_attendance_reports))
        .route_layer(from_fn(allow_faculty));

    Router::new()
        .route("/qr/generate/{event_id}", post(generate_qr_code))
        .route("/qr/mark", post(mark_attendance_by_qr))
        .route("/mark-for-others", post(mark_attendance_for_other))
        .route("/mark-others/{event_id}", post(mark_attendance_batch))
        .route("/edit/{event_id}/{user_id}", put(edit_attendance))
        .route("/my-attendance", get(get_own_attendance))
        .route("/summary/{user_id}", get(get_attendance_summary))
        .merge(reports)
}
