use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use crate::response::{ApiResponse, domain_error_response};
use crate::{
    auth::AuthUser,
    routes::attendance::common::{
        AttendanceResponse, authorize_coordinator, parse_attendance_status,
    },
};
use db::models::attendance;
use util::state::AppState;

#[derive(Deserialize)]
pub struct EditAttendanceReq {
    pub status: String,
    pub notes: Option<String>,
}

/// PUT `/api/attendance/edit/{event_id}/{user_id}`
///
/// Edits an existing attendance record. Refuses to create one: use
/// `mark-for-others` for first-time marking. Idempotent.
///
/// **Auth**: the event's club coordinator (strict policy check).
pub async fn edit_attendance(
    State(state): State<AppState>,
    Path((event_id, user_id)): Path<(i64, i64)>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<EditAttendanceReq>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceResponse>>>) {
    let db = state.db();
    let caller = user.caller();

    let event = match authorize_coordinator(db, event_id, &caller).await {
        Ok(e) => e,
        Err(e) => return domain_error_response(e),
    };

    let status = match parse_attendance_status(&body.status) {
        Ok(s) => s,
        Err(e) => return domain_error_response(e),
    };

    match attendance::Model::edit(
        db,
        event.id,
        caller.id,
        user_id,
        status,
        body.notes.as_deref(),
        Utc::now(),
    )
    .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(AttendanceResponse::from(record)),
                "Attendance updated successfully",
            )),
        ),
        Err(e) => domain_error_response(e),
    }
}
