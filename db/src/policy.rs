//! The one authorization decision tying attendance and QR mutations to club
//! coordinatorship.
//!
//! Every mutating entry point routes through [`can_mutate_attendance`] with
//! a club resolved *fresh* from storage (see [`club_for_event`]); handlers
//! must never cache a coordinator id across requests, or a re-assigned club
//! would keep authorizing its previous coordinator.

use sea_orm::DatabaseConnection;

use crate::error::DomainError;
use crate::models::{club, event, user::Role};

/// The authenticated caller, as asserted by the external identity gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

/// True iff the caller is faculty AND coordinates the club owning the event.
///
/// This is the strict check gating every attendance mutation and QR
/// generation. Being faculty alone is not enough, and coordinating a
/// *different* club is not enough.
pub fn can_mutate_attendance(caller: &Caller, club: &club::Model) -> bool {
    caller.role == Role::Faculty && club.faculty_coordinator_id == caller.id
}

/// The looser check for read-only report endpoints: any faculty member may
/// view attendance records, including outside their own clubs.
pub fn can_view_reports(caller: &Caller) -> bool {
    caller.role == Role::Faculty
}

/// Resolves the club owning an event, fresh from storage.
pub async fn club_for_event(
    db: &DatabaseConnection,
    event: &event::Model,
) -> Result<club::Model, DomainError> {
    club::Model::find_by_id(db, event.club_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Club not found for this event".into()))
}
