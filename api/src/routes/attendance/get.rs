use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::response::{ApiResponse, domain_error_response};
use crate::{
    auth::AuthUser,
    routes::attendance::common::{AttendanceResponse, ListQuery, RecordsListResponse, ReportsQuery},
};
use db::DomainError;
use db::models::attendance::{
    self, Column as AttCol, Entity as AttEntity, EventStatistics, Status,
};
use db::models::{event, registration};
use db::policy;
use util::state::AppState;

fn parse_status_filter(raw: Option<&str>) -> Result<Option<Status>, DomainError> {
    match raw {
        None => Ok(None),
        Some(s) => Status::from_str(s)
            .map(Some)
            .map_err(|_| DomainError::BadRequest(format!("Invalid attendance status: '{s}'"))),
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10000.0).round() / 100.0
}

#[derive(Debug, Serialize, Default)]
pub struct EventAttendanceResponse {
    pub docs: Vec<AttendanceResponse>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
    pub statistics: Option<EventStatistics>,
}

/// GET `/api/attendance/event/{event_id}`
///
/// Event attendance report: the records plus a statistics block.
///
/// **Auth**: faculty (router layer, loose check) — faculty may *view*
/// records outside their own clubs; mutation stays coordinator-gated.
///
/// **Query**:
/// - `status` *(optional)*: `present` | `absent` | `late`
/// - `page` *(default 1)*, `per_page` *(default 10, max 100)*
pub async fn get_event_attendance(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<EventAttendanceResponse>>) {
    let db = state.db();

    match event::Model::find_by_id(db, event_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return domain_error_response(DomainError::NotFound("Event not found".into()));
        }
        Err(e) => return domain_error_response(DomainError::Db(e)),
    }

    let status = match parse_status_filter(q.status.as_deref()) {
        Ok(s) => s,
        Err(e) => return domain_error_response(e),
    };

    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(10).clamp(1, 100) as u64;

    let mut sel = AttEntity::find()
        .filter(AttCol::EventId.eq(event_id))
        .order_by_desc(AttCol::MarkedAt);
    if let Some(status) = status {
        sel = sel.filter(AttCol::Status.eq(status));
    }

    let paginator = sel.paginate(db, per_page);
    let total = paginator.num_items().await.unwrap_or(0) as i32;
    let rows = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    let statistics = match attendance::Model::event_statistics(db, event_id).await {
        Ok(s) => s,
        Err(e) => return domain_error_response(DomainError::Db(e)),
    };

    let resp = EventAttendanceResponse {
        docs: rows.into_iter().map(AttendanceResponse::from).collect(),
        page: page as i32,
        per_page: per_page as i32,
        total,
        statistics: Some(statistics),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            resp,
            "Event attendance retrieved successfully",
        )),
    )
}

/// GET `/api/attendance/reports`
///
/// All attendance records, filterable by event, user, and status.
///
/// **Auth**: faculty (router layer, loose check).
pub async fn get_all_attendance_reports(
    State(state): State<AppState>,
    Query(q): Query<ReportsQuery>,
) -> (StatusCode, Json<ApiResponse<Option<RecordsListResponse>>>) {
    let db = state.db();

    let status = match parse_status_filter(q.status.as_deref()) {
        Ok(s) => s,
        Err(e) => return domain_error_response(e),
    };

    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(10).clamp(1, 100) as u64;

    let mut sel = AttEntity::find().order_by_desc(AttCol::MarkedAt);
    if let Some(event_id) = q.event_id {
        sel = sel.filter(AttCol::EventId.eq(event_id));
    }
    if let Some(user_id) = q.user_id {
        sel = sel.filter(AttCol::UserId.eq(user_id));
    }
    if let Some(status) = status {
        sel = sel.filter(AttCol::Status.eq(status));
    }

    let paginator = sel.paginate(db, per_page);
    let total = paginator.num_items().await.unwrap_or(0) as i32;
    let rows = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    let resp = RecordsListResponse {
        docs: rows.into_iter().map(AttendanceResponse::from).collect(),
        page: page as i32,
        per_page: per_page as i32,
        total,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Some(resp),
            "All attendance reports retrieved successfully",
        )),
    )
}

#[derive(Debug, Serialize, Default)]
pub struct StatusBreakdown {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
}

#[derive(Debug, Serialize, Default)]
pub struct OwnAttendanceResponse {
    pub total_registered_events: u64,
    pub total_attendance_marked: u64,
    pub attendance_percentage: f64,
    pub present_percentage: f64,
    pub breakdown: StatusBreakdown,
}

/// GET `/api/attendance/my-attendance`
///
/// The caller's own attendance as a percentage summary.
pub async fn get_own_attendance(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<OwnAttendanceResponse>>) {
    let db = state.db();

    let result: Result<OwnAttendanceResponse, sea_orm::DbErr> = async {
        let total_registered = registration::Model::count_for_user(db, claims.sub).await?;
        let total_marked = attendance::Model::count_for_user(db, claims.sub).await?;
        let (present, absent, late) = attendance::Model::breakdown_for_user(db, claims.sub).await?;

        Ok(OwnAttendanceResponse {
            total_registered_events: total_registered,
            total_attendance_marked: total_marked,
            attendance_percentage: percentage(total_marked, total_registered),
            present_percentage: percentage(present, total_marked),
            breakdown: StatusBreakdown {
                present,
                absent,
                late,
            },
        })
    }
    .await;

    match result {
        Ok(resp) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                resp,
                "Attendance percentage retrieved successfully",
            )),
        ),
        Err(e) => domain_error_response(DomainError::Db(e)),
    }
}

#[derive(Debug, Serialize, Default)]
pub struct AttendanceSummaryResponse {
    pub total_events_registered: u64,
    pub total_attendance_marked: u64,
    pub attendance_rate: f64,
    pub breakdown: StatusBreakdown,
}

/// GET `/api/attendance/summary/{user_id}`
///
/// Attendance summary for a user. Students may only query themselves;
/// faculty may query anyone.
pub async fn get_attendance_summary(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<AttendanceSummaryResponse>>) {
    let db = state.db();
    let caller = user.caller();

    if user_id != caller.id && !policy::can_view_reports(&caller) {
        return domain_error_response(DomainError::Forbidden(
            "You can only view your own attendance summary".into(),
        ));
    }

    let result: Result<AttendanceSummaryResponse, sea_orm::DbErr> = async {
        let total_registered = registration::Model::count_for_user(db, user_id).await?;
        let total_marked = attendance::Model::count_for_user(db, user_id).await?;
        let (present, absent, late) = attendance::Model::breakdown_for_user(db, user_id).await?;

        Ok(AttendanceSummaryResponse {
            total_events_registered: total_registered,
            total_attendance_marked: total_marked,
            attendance_rate: percentage(total_marked, total_registered),
            breakdown: StatusBreakdown {
                present,
                absent,
                late,
            },
        })
    }
    .await;

    match result {
        Ok(resp) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                resp,
                "Attendance summary retrieved successfully",
            )),
        ),
        Err(e) => domain_error_response(DomainError::Db(e)),
    }
}
