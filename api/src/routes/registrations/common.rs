use db::models::registration::{ParticipantType, Status};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub registration_date: String,
    pub status: Status,
    pub participant_type: ParticipantType,
    pub notes: Option<String>,
}

impl From<db::models::registration::Model> for RegistrationResponse {
    fn from(m: db::models::registration::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            event_id: m.event_id,
            registration_date: m.registration_date.to_rfc3339(),
            status: m.status,
            participant_type: m.participant_type,
            notes: m.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i32>,
    pub per_page: Option<i32>,
    /// Filter by registration status (`registered`, `cancelled`, `attended`, `no_show`).
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub registrations: Vec<RegistrationResponse>,
    pub page: i32,
    pub per_page: i32,
    pub total: i32,
}
