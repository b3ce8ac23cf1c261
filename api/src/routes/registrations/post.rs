use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::response::{ApiResponse, domain_error_response};
use crate::services::email::EmailService;
use crate::{auth::AuthUser, routes::registrations::common::RegistrationResponse};
use db::models::registration::{self, ParticipantType};
use db::models::{event, user};
use util::state::AppState;

#[derive(Deserialize)]
pub struct RegisterReq {
    pub event_id: i64,
    pub participant_type: Option<ParticipantType>,
}

/// POST `/api/registrations/register`
///
/// Registers the caller for an event. Duplicate registrations and full
/// events are conflicts; the confirmation email is best-effort and never
/// fails the registration.
pub async fn register_for_event(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<RegisterReq>,
) -> (StatusCode, Json<ApiResponse<Option<RegistrationResponse>>>) {
    let db = state.db();
    let participant_type = body.participant_type.unwrap_or(ParticipantType::ClubMember);

    let registration =
        match registration::Model::register(db, claims.sub, body.event_id, participant_type).await
        {
            Ok(r) => r,
            Err(e) => return domain_error_response(e),
        };

    // Confirmation email runs detached so a slow or failing SMTP relay
    // cannot affect the response.
    let db_for_mail = state.db_clone();
    let event_id = body.event_id;
    let user_id = claims.sub;
    tokio::spawn(async move {
        let user = user::Model::find_by_id(&db_for_mail, user_id).await;
        let event = event::Model::find_by_id(&db_for_mail, event_id).await;
        if let (Ok(Some(user)), Ok(Some(event))) = (user, event) {
            if let Err(e) = EmailService::send_registration_confirmation(
                &user.email,
                &user.name,
                &event.title,
                event.start_date,
                event.location.as_deref(),
            )
            .await
            {
                tracing::warn!(error = %e, user_id, event_id, "failed to send registration confirmation");
            }
        }
    });

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(RegistrationResponse::from(registration)),
            "Successfully registered for event",
        )),
    )
}

#[derive(Deserialize)]
pub struct UnregisterReq {
    pub event_id: i64,
}

/// POST `/api/registrations/unregister`
///
/// Deletes the caller's registration. Only registrations still in the
/// `registered` state can be withdrawn.
pub async fn unregister_from_event(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<UnregisterReq>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    let db = state.db();

    match registration::Model::unregister(db, claims.sub, body.event_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                (),
                "Successfully unregistered from event",
            )),
        ),
        Err(e) => domain_error_response(e),
    }
}
