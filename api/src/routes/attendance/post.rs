use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::response::{ApiResponse, domain_error_response};
use crate::services::qr;
use crate::{
    auth::AuthUser,
    routes::attendance::common::{
        AttendanceResponse, QrGenerateResponse, authorize_coordinator, parse_attendance_status,
    },
};
use db::DomainError;
use db::models::attendance;
use db::models::event::{self, QrPayload};
use util::config::AppConfig;
use util::state::AppState;

/// POST `/api/attendance/qr/generate/{event_id}`
///
/// Issues a fresh proof-of-presence session for the event and returns the
/// QR image. Generating again before expiry replaces the previous session;
/// only the newest token validates.
///
/// **Auth**: the event's club coordinator (strict policy check).
pub async fn generate_qr_code(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Option<QrGenerateResponse>>>) {
    let db = state.db();
    let caller = user.caller();

    let event = match authorize_coordinator(db, event_id, &caller).await {
        Ok(e) => e,
        Err(e) => return domain_error_response(e),
    };

    let ttl = Duration::minutes(AppConfig::global().qr_session_ttl_minutes);
    let now = Utc::now();

    let session = match event::Model::issue_qr_session(db, event.id, caller.id, now, ttl).await {
        Ok(s) => s,
        Err(e) => return domain_error_response(e),
    };

    let payload = QrPayload::new(event.id, &session);
    let qr_data = match serde_json::to_string(&payload) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize QR payload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to generate QR code")),
            );
        }
    };
    let qr_code_url = match qr::payload_data_url(&qr_data) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "failed to render QR image");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to generate QR code")),
            );
        }
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Some(QrGenerateResponse {
                qr_code_url,
                qr_data,
                expires_at: session.expires_at.to_rfc3339(),
            }),
            "QR code generated successfully",
        )),
    )
}

#[derive(Deserialize)]
pub struct MarkByQrReq {
    /// The literal string produced by scanning the QR image.
    pub qr_data: String,
}

/// POST `/api/attendance/qr/mark`
///
/// Converts a scanned QR payload into an attendance record for the caller
/// and flips their registration to `attended`. A second scan for the same
/// pair is a conflict, not a no-op.
pub async fn mark_attendance_by_qr(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<MarkByQrReq>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceResponse>>>) {
    let db = state.db();

    let payload: QrPayload = match serde_json::from_str(&body.qr_data) {
        Ok(p) => p,
        Err(_) => {
            return domain_error_response(DomainError::BadRequest("Invalid QR code data".into()));
        }
    };

    match attendance::Model::mark_via_qr(db, claims.sub, &payload, Utc::now()).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                Some(AttendanceResponse::from(record)),
                "Attendance marked successfully via QR code",
            )),
        ),
        Err(e) => domain_error_response(e),
    }
}

#[derive(Deserialize)]
pub struct MarkForOtherReq {
    pub event_id: i64,
    pub user_id: i64,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// POST `/api/attendance/mark-for-others`
///
/// Creates or updates a single attendance record on the coordinator's
/// behalf. Idempotent: re-submitting the same status is a no-op update.
///
/// **Auth**: the event's club coordinator (strict policy check).
pub async fn mark_attendance_for_other(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<MarkForOtherReq>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceResponse>>>) {
    let db = state.db();
    let caller = user.caller();

    let event = match authorize_coordinator(db, body.event_id, &caller).await {
        Ok(e) => e,
        Err(e) => return domain_error_response(e),
    };

    let status = match parse_attendance_status(body.status.as_deref().unwrap_or("present")) {
        Ok(s) => s,
        Err(e) => return domain_error_response(e),
    };

    match attendance::Model::mark_for_user(
        db,
        event.id,
        caller.id,
        body.user_id,
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
                "Attendance marked successfully",
            )),
        ),
        Err(e) => domain_error_response(e),
    }
}

#[derive(Deserialize)]
pub struct BatchEntry {
    pub user_id: i64,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchMarkReq {
    pub attendance_data: Vec<BatchEntry>,
}

#[derive(Serialize, Default)]
pub struct BatchMarkResponse {
    pub results: Vec<AttendanceResponse>,
    pub errors: Vec<String>,
}

/// POST `/api/attendance/mark-others/{event_id}`
///
/// Batch version of `mark-for-others`. The coordinator check runs once;
/// each entry is then processed independently and failures are collected
/// into `errors` so one bad entry never aborts the rest.
pub async fn mark_attendance_batch(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BatchMarkReq>,
) -> (StatusCode, Json<ApiResponse<BatchMarkResponse>>) {
    let db = state.db();
    let caller = user.caller();

    let event = match authorize_coordinator(db, event_id, &caller).await {
        Ok(e) => e,
        Err(e) => return domain_error_response(e),
    };

    let now = Utc::now();
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for entry in body.attendance_data {
        let status = match parse_attendance_status(entry.status.as_deref().unwrap_or("present")) {
            Ok(s) => s,
            Err(e) => {
                errors.push(format!("User {}: {}", entry.user_id, e));
                continue;
            }
        };

        match attendance::Model::mark_for_user(
            db,
            event.id,
            caller.id,
            entry.user_id,
            status,
            entry.notes.as_deref(),
            now,
        )
        .await
        {
            Ok(record) => results.push(AttendanceResponse::from(record)),
            Err(e) => errors.push(format!("User {}: {}", entry.user_id, e)),
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            BatchMarkResponse { results, errors },
            "Attendance marking completed",
        )),
    )
}
