use db::DomainError;
use db::models::attendance::Status;
use db::models::event;
use db::policy::{self, Caller};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub marked_by: i64,
    pub marked_at: String,
    pub status: Status,
    pub notes: Option<String>,
}

impl From<db::models::attendance::Model> for AttendanceResponse {
    fn from(m: db::models::attendance::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            event_id: m.event_id,
            marked_by: m.marked_by,
            marked_at: m.marked_at.to_rfc3339(),
            status: m.status,
            notes: m.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QrGenerateResponse {
    /// Data URL of the QR image; its encoded content is exactly `qr_data`.
    pub qr_code_url: String,
    /// The literal payload a scanner must post back to the mark endpoint.
    pub qr_data: String,
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    /// Filter by attendance status (`present`, `absent`, `late`).
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    pub status: Option<String>,
    pub event_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecordsListResponse {
    pub docs: Vec<AttendanceResponse>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}

/// Resolves the event and enforces the strict coordinator policy.
///
/// The club is looked up fresh on every call; a coordinator change takes
/// effect on the next request, never later.
pub async fn authorize_coordinator(
    db: &DatabaseConnection,
    event_id: i64,
    caller: &Caller,
) -> Result<event::Model, DomainError> {
    let event = event::Model::find_by_id(db, event_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Event not found".into()))?;

    let club = policy::club_for_event(db, &event).await?;
    if !policy::can_mutate_attendance(caller, &club) {
        return Err(DomainError::Forbidden(
            "Only the club's faculty coordinator can manage attendance for this event".into(),
        ));
    }
    Ok(event)
}

/// Parses a wire status string, rejecting unknown values as a bad request.
pub fn parse_attendance_status(raw: &str) -> Result<Status, DomainError> {
    use std::str::FromStr;
    Status::from_str(raw)
        .map_err(|_| DomainError::BadRequest(format!("Invalid attendance status: '{raw}'")))
}
