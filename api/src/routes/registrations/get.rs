use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::{
    auth::AuthUser,
    routes::registrations::common::{ListQuery, ListResponse, RegistrationResponse},
};
use db::models::registration::{self, Column as RegCol, Entity as RegEntity, Status};
use util::state::AppState;

fn parse_status(raw: Option<&str>) -> Result<Option<Status>, String> {
    match raw {
        None => Ok(None),
        Some(s) => Status::from_str(s)
            .map(Some)
            .map_err(|_| format!("Invalid registration status: '{s}'")),
    }
}

/// GET `/api/registrations/my-registrations`
///
/// Lists the caller's registrations, newest first.
///
/// **Query**:
/// - `status` *(optional)*: filter by registration status
/// - `page` *(default 1)*
/// - `per_page` *(default 10, max 100)*
pub async fn get_my_registrations(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Option<ListResponse>>>) {
    list_registrations(state, RegCol::UserId.eq(claims.sub), q).await
}

/// GET `/api/registrations/event/{event_id}`
///
/// Lists all registrations for an event, newest first.
///
/// **Auth**: faculty (router layer). Faculty may inspect registrations for
/// any event; per-record mutation stays coordinator-gated elsewhere.
pub async fn get_event_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Option<ListResponse>>>) {
    let db = state.db();
    match db::models::event::Model::find_by_id(db, event_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Event not found")),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error while checking event")),
            );
        }
    }

    list_registrations(state, RegCol::EventId.eq(event_id), q).await
}

async fn list_registrations(
    state: AppState,
    scope: sea_orm::sea_query::SimpleExpr,
    q: ListQuery,
) -> (StatusCode, Json<ApiResponse<Option<ListResponse>>>) {
    let db = state.db();
    let page = q.page.unwrap_or(1).max(1) as u64;
    let per_page = q.per_page.unwrap_or(10).clamp(1, 100) as u64;

    let status = match parse_status(q.status.as_deref()) {
        Ok(s) => s,
        Err(msg) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg))),
    };

    let mut sel = RegEntity::find()
        .filter(scope)
        .order_by_desc(RegCol::RegistrationDate);
    if let Some(status) = status {
        sel = sel.filter(RegCol::Status.eq(status));
    }

    let paginator = sel.paginate(db, per_page);
    let total = paginator.num_items().await.unwrap_or(0) as i32;
    let rows = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    let resp = ListResponse {
        registrations: rows.into_iter().map(RegistrationResponse::from).collect(),
        page: page as i32,
        per_page: per_page as i32,
        total,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Some(resp),
            "Registrations retrieved successfully",
        )),
    )
}

#[derive(Debug, Serialize, Default)]
pub struct RegistrationStatusResponse {
    pub is_registered: bool,
    pub registration: Option<RegistrationResponse>,
}

/// GET `/api/registrations/status/{event_id}`
///
/// Tells the caller whether they are registered for an event.
pub async fn check_registration_status(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<RegistrationStatusResponse>>) {
    let db = state.db();

    match registration::Model::find_for(db, claims.sub, event_id).await {
        Ok(found) => {
            let resp = RegistrationStatusResponse {
                is_registered: found.is_some(),
                registration: found.map(RegistrationResponse::from),
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    resp,
                    "Registration status checked successfully",
                )),
            )
        }
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(
                "Database error while checking registration",
            )),
        ),
    }
}
