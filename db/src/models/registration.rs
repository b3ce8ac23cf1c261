use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, PaginatorTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DomainError;
use crate::models::event;

/// A user's declared intent to attend an event, independent of whether they
/// actually showed up. One row per `(user, event)` pair, enforced by a
/// unique index.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "registrations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub registration_date: DateTime<Utc>,
    pub status: Status,
    pub participant_type: ParticipantType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a registration.
///
/// `Registered` is the only state a user can unregister from; `Attended`
/// and `NoShow` are reached through the attendance recorder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "registration_status_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "registered")]
    Registered,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,

    #[sea_orm(string_value = "attended")]
    Attended,

    #[sea_orm(string_value = "no_show")]
    NoShow,
}

/// The role a registrant declares for an event, orthogonal to attendance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "participant_type_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ParticipantType {
    #[sea_orm(string_value = "club_member")]
    ClubMember,

    #[sea_orm(string_value = "volunteer")]
    Volunteer,
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

impl Model {
    /// Registers a user for an event.
    ///
    /// Preconditions: the event exists and is active; no registration for
    /// the pair yet; free capacity when `max_capacity` is set. The
    /// duplicate and capacity checks run inside one transaction, and the
    /// unique `(user_id, event_id)` index backstops any race the check
    /// misses: of two concurrent attempts, exactly one insert succeeds.
    pub async fn register(
        db: &DatabaseConnection,
        user_id: i64,
        event_id: i64,
        participant_type: ParticipantType,
    ) -> Result<Self, DomainError> {
        let event = event::Model::find_by_id(db, event_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Event not found".into()))?;

        if !event.is_active {
            return Err(DomainError::Conflict("Event is not active".into()));
        }

        let txn = db.begin().await?;

        if Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::EventId.eq(event_id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(DomainError::Conflict(
                "You are already registered for this event".into(),
            ));
        }

        if let Some(max_capacity) = event.max_capacity {
            let registered = Entity::find()
                .filter(Column::EventId.eq(event_id))
                .filter(Column::Status.eq(Status::Registered))
                .count(&txn)
                .await?;
            if registered >= max_capacity as u64 {
                return Err(DomainError::Conflict("Event is at full capacity".into()));
            }
        }

        let now = Utc::now();
        let registration = ActiveModel {
            user_id: Set(user_id),
            event_id: Set(event_id),
            registration_date: Set(now),
            status: Set(Status::Registered),
            participant_type: Set(participant_type),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let registration = registration.insert(&txn).await.map_err(|e| {
            DomainError::from_insert(e, "You are already registered for this event")
        })?;

        txn.commit().await?;
        Ok(registration)
    }

    /// Deletes a user's registration for an event.
    ///
    /// Only a registration still in the `Registered` state may be
    /// withdrawn; attended or no-show records are part of history.
    pub async fn unregister(
        db: &DatabaseConnection,
        user_id: i64,
        event_id: i64,
    ) -> Result<(), DomainError> {
        let registration = Self::find_for(db, user_id, event_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound("You are not registered for this event".into())
            })?;

        if registration.status != Status::Registered {
            return Err(DomainError::Conflict(
                "Only active registrations can be withdrawn".into(),
            ));
        }

        Entity::delete_by_id(registration.id).exec(db).await?;
        Ok(())
    }

    /// The registration for a `(user, event)` pair, if any.
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

    /// Count of rows still in the `Registered` state for an event.
    pub async fn count_registered(db: &DatabaseConnection, event_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::Status.eq(Status::Registered))
            .count(db)
            .await
    }

    /// Total registrations for an event, regardless of state.
    pub async fn count_for_event(db: &DatabaseConnection, event_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .count(db)
            .await
    }

    /// Total registrations held by a user, regardless of state.
    pub async fn count_for_user(db: &DatabaseConnection, user_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .count(db)
            .await
    }

    /// Sets the status of the pair's registration as a single field-level
    /// UPDATE, so it composes with concurrent writers without lost updates.
    pub async fn set_status_for_pair(
        db: &DatabaseConnection,
        user_id: i64,
        event_id: i64,
        status: Status,
    ) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::Status, Expr::value(status))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::EventId.eq(event_id))
            .exec(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{club, event, user, user::Role};
    use crate::test_utils::setup_test_db;
    use chrono::Duration;

    async fn seed_event(db: &DatabaseConnection, max_capacity: Option<i32>) -> event::Model {
        let coord = user::Model::create(db, "Dr. Iyer", "iyer@uni.test", Role::Faculty, None)
            .await
            .unwrap();
        let club = club::Model::create(db, "Film Society", None, coord.id)
            .await
            .unwrap();
        let start = Utc::now() + Duration::days(3);
        event::Model::create(
            db,
            "Screening",
            club.id,
            coord.id,
            start,
            start + Duration::hours(2),
            max_capacity,
            None,
        )
        .await
        .unwrap()
    }

    async fn seed_student(db: &DatabaseConnection, email: &str) -> user::Model {
        user::Model::create(db, "Student", email, Role::Student, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn double_registration_yields_one_row_and_a_conflict() {
        let db = setup_test_db().await;
        let event = seed_event(&db, None).await;
        let student = seed_student(&db, "s1@uni.test").await;

        Model::register(&db, student.id, event.id, ParticipantType::ClubMember)
            .await
            .unwrap();
        let err = Model::register(&db, student.id, event.id, ParticipantType::ClubMember)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        assert_eq!(Model::count_for_event(&db, event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let db = setup_test_db().await;
        let event = seed_event(&db, Some(2)).await;

        for i in 0..2 {
            let s = seed_student(&db, &format!("s{i}@uni.test")).await;
            Model::register(&db, s.id, event.id, ParticipantType::Volunteer)
                .await
                .unwrap();
        }

        let extra = seed_student(&db, "overflow@uni.test").await;
        let err = Model::register(&db, extra.id, event.id, ParticipantType::Volunteer)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(Model::count_registered(&db, event.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unregister_requires_registered_state() {
        let db = setup_test_db().await;
        let event = seed_event(&db, None).await;
        let student = seed_student(&db, "s1@uni.test").await;

        let err = Model::unregister(&db, student.id, event.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        Model::register(&db, student.id, event.id, ParticipantType::ClubMember)
            .await
            .unwrap();
        Model::set_status_for_pair(&db, student.id, event.id, Status::Attended)
            .await
            .unwrap();

        let err = Model::unregister(&db, student.id, event.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        Model::set_status_for_pair(&db, student.id, event.id, Status::Registered)
            .await
            .unwrap();
        Model::unregister(&db, student.id, event.id).await.unwrap();
        assert!(Model::find_for(&db, student.id, event.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn register_for_missing_or_inactive_event_fails() {
        let db = setup_test_db().await;
        let student = seed_student(&db, "s1@uni.test").await;

        let err = Model::register(&db, student.id, 404, ParticipantType::ClubMember)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let event = seed_event(&db, None).await;
        event::Entity::update_many()
            .col_expr(event::Column::IsActive, Expr::value(false))
            .filter(event::Column::Id.eq(event.id))
            .exec(&db)
            .await
            .unwrap();

        let err = Model::register(&db, student.id, event.id, ParticipantType::ClubMember)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
