use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, PaginatorTrait, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DomainError;
use crate::models::{event, registration};

/// The recorded fact of presence/absence/lateness for a given user at a
/// given event. One row per `(user, event)` pair, enforced by a unique
/// index, and never created without a prior registration for the pair.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    /// The coordinator who recorded it, or the user themselves for QR scans.
    pub marked_by: i64,
    pub marked_at: DateTime<Utc>,
    pub status: Status,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "absent")]
    Absent,

    #[sea_orm(string_value = "late")]
    Late,
}

/// The registration state implied by an attendance status.
///
/// One fixed table applied by every marking path: a late arrival still
/// attended, an absence is a no-show.
pub fn registration_status_for(status: Status) -> registration::Status {
    match status {
        Status::Present | Status::Late => registration::Status::Attended,
        Status::Absent => registration::Status::NoShow,
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::MarkedBy",
        to = "super::user::Column::Id"
    )]
    Marker,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Per-event attendance statistics for faculty reports.
#[derive(Debug, Clone, Serialize)]
pub struct EventStatistics {
    pub total_registered: u64,
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    /// Marked records as a percentage of registrations, two decimals.
    pub attendance_rate: f64,
}

impl Model {
    /// Records presence from a scanned QR payload.
    ///
    /// This path is deliberately NOT idempotent: a second scan for the same
    /// pair is a conflict the client must show the user, not a silent no-op.
    pub async fn mark_via_qr(
        db: &DatabaseConnection,
        user_id: i64,
        payload: &event::QrPayload,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if payload.kind != event::QrPayload::KIND_ATTENDANCE {
            return Err(DomainError::BadRequest("Invalid QR code type".into()));
        }

        let event_id: i64 = payload
            .event_id
            .parse()
            .map_err(|_| DomainError::BadRequest("Invalid QR code data".into()))?;

        // Always validate against the event's *stored* session, never the
        // scanned payload alone: a newer generation supersedes old images.
        let event = event::Model::find_by_id(db, event_id)
            .await?
            .ok_or_else(|| DomainError::Conflict("Invalid or expired QR code".into()))?;

        match event.qr_token_status(&payload.token, now) {
            event::QrTokenStatus::Valid => {}
            event::QrTokenStatus::Expired => {
                return Err(DomainError::Conflict("QR code has expired".into()));
            }
            event::QrTokenStatus::Invalid => {
                return Err(DomainError::Conflict("Invalid or expired QR code".into()));
            }
        }

        if registration::Model::find_for(db, user_id, event_id)
            .await?
            .is_none()
        {
            return Err(DomainError::Conflict(
                "You are not registered for this event".into(),
            ));
        }

        if Self::find_for(db, user_id, event_id).await?.is_some() {
            return Err(DomainError::Conflict(
                "Attendance already marked for this event".into(),
            ));
        }

        let attendance = ActiveModel {
            user_id: Set(user_id),
            event_id: Set(event_id),
            marked_by: Set(user_id),
            marked_at: Set(now),
            status: Set(Status::Present),
            notes: Set(Some("Marked via QR code".into())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let attendance = attendance.insert(db).await.map_err(|e| {
            DomainError::from_insert(e, "Attendance already marked for this event")
        })?;

        registration::Model::set_status_for_pair(
            db,
            user_id,
            event_id,
            registration::Status::Attended,
        )
        .await?;

        Ok(attendance)
    }

    /// Creates or updates an attendance record on behalf of a coordinator.
    ///
    /// Unlike the scan path this is idempotent: re-submitting the same
    /// status is a harmless update. The registration status follows
    /// [`registration_status_for`].
    pub async fn mark_for_user(
        db: &DatabaseConnection,
        event_id: i64,
        marked_by: i64,
        user_id: i64,
        status: Status,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if registration::Model::find_for(db, user_id, event_id)
            .await?
            .is_none()
        {
            return Err(DomainError::Conflict(format!(
                "User {user_id} is not registered for this event"
            )));
        }

        let attendance = match Self::find_for(db, user_id, event_id).await? {
            Some(existing) => {
                let mut active: ActiveModel = existing.into();
                active.status = Set(status);
                active.notes = Set(notes.map(|s| s.to_owned()));
                active.marked_by = Set(marked_by);
                active.marked_at = Set(now);
                active.updated_at = Set(now);
                active.update(db).await?
            }
            None => {
                let fresh = ActiveModel {
                    user_id: Set(user_id),
                    event_id: Set(event_id),
                    marked_by: Set(marked_by),
                    marked_at: Set(now),
                    status: Set(status),
                    notes: Set(notes.map(|s| s.to_owned())),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                fresh.insert(db).await.map_err(|e| {
                    DomainError::from_insert(e, "Attendance already marked for this event")
                })?
            }
        };

        registration::Model::set_status_for_pair(
            db,
            user_id,
            event_id,
            registration_status_for(status),
        )
        .await?;

        Ok(attendance)
    }

    /// Updates an existing record; unlike [`mark_for_user`] it refuses to
    /// create one.
    pub async fn edit(
        db: &DatabaseConnection,
        event_id: i64,
        marked_by: i64,
        user_id: i64,
        status: Status,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let existing = Self::find_for(db, user_id, event_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound("Attendance record not found for this user and event".into())
            })?;

        let mut active: ActiveModel = existing.into();
        active.status = Set(status);
        active.notes = Set(notes.map(|s| s.to_owned()));
        active.marked_by = Set(marked_by);
        active.updated_at = Set(now);
        let attendance = active.update(db).await?;

        registration::Model::set_status_for_pair(
            db,
            user_id,
            event_id,
            registration_status_for(status),
        )
        .await?;

        Ok(attendance)
    }

    /// The attendance record for a `(user, event)` pair, if any.
    pub async fn find_for(
        db: &DatabaseConnection,
        user_id: i64,
        event_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::EventId.eq(event_id))
            .one(db)
            .await
    }

    pub async fn count_for_user(db: &DatabaseConnection, user_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .count(db)
            .await
    }

    /// Per-status counts for a user, in `Present`/`Absent`/`Late` order.
    pub async fn breakdown_for_user(
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<(u64, u64, u64), DbErr> {
        let mut counts = [0u64; 3];
        for (slot, status) in [Status::Present, Status::Absent, Status::Late]
            .into_iter()
            .enumerate()
        {
            counts[slot] = Entity::find()
                .filter(Column::UserId.eq(user_id))
                .filter(Column::Status.eq(status))
                .count(db)
                .await?;
        }
        Ok((counts[0], counts[1], counts[2]))
    }

    /// Statistics block attached to the faculty event report.
    pub async fn event_statistics(
        db: &DatabaseConnection,
        event_id: i64,
    ) -> Result<EventStatistics, DbErr> {
        let total_registered = registration::Model::count_for_event(db, event_id).await?;

        let mut counts = [0u64; 3];
        for (slot, status) in [Status::Present, Status::Absent, Status::Late]
            .into_iter()
            .enumerate()
        {
            counts[slot] = Entity::find()
                .filter(Column::EventId.eq(event_id))
                .filter(Column::Status.eq(status))
                .count(db)
                .await?;
        }

        let marked: u64 = counts.iter().sum();
        let attendance_rate = if total_registered > 0 {
            ((marked as f64 / total_registered as f64) * 10000.0).round() / 100.0
        } else {
            0.0
        };

        Ok(EventStatistics {
            total_registered,
            present: counts[0],
            absent: counts[1],
            late: counts[2],
            attendance_rate,
        })
    }
}
