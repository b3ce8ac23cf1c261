use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, Set};

use crate::error::DomainError;
use crate::models::club_member;

/// Represents a club in the `clubs` table.
///
/// The faculty coordinator is the single user with mutation authority over
/// the club's events' attendance records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "clubs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub faculty_coordinator_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FacultyCoordinatorId",
        to = "super::user::Column::Id"
    )]
    Coordinator,
    #[sea_orm(has_many = "super::event::Entity")]
    Events,
    #[sea_orm(has_many = "super::club_member::Entity")]
    Members,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::club_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a club and enrols the coordinator as its first member.
    pub async fn create(
        db: &DatabaseConnection,
        name: &str,
        description: Option<&str>,
        faculty_coordinator_id: i64,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let club = ActiveModel {
            name: Set(name.to_owned()),
            description: Set(description.map(|s| s.to_owned())),
            faculty_coordinator_id: Set(faculty_coordinator_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let club = club
            .insert(db)
            .await
            .map_err(|e| DomainError::from_insert(e, "A club with this name already exists"))?;

        club_member::Model::add(db, club.id, faculty_coordinator_id).await?;
        Ok(club)
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Adds a member to the club. Re-adding an existing member is a no-op.
    pub async fn add_member(
        db: &DatabaseConnection,
        club_id: i64,
        user_id: i64,
    ) -> Result<(), DomainError> {
        club_member::Model::add(db, club_id, user_id).await
    }

    /// Removes a member from the club.
    ///
    /// The faculty coordinator cannot be removed through this operation.
    pub async fn remove_member(
        &self,
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<(), DomainError> {
        if user_id == self.faculty_coordinator_id {
            return Err(DomainError::Conflict(
                "The faculty coordinator cannot be removed from the club".into(),
            ));
        }

        let res = club_member::Entity::delete_many()
            .filter(club_member::Column::ClubId.eq(self.id))
            .filter(club_member::Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        if res.rows_affected == 0 {
            return Err(DomainError::NotFound(
                "User is not a member of this club".into(),
            ));
        }
        Ok(())
    }

    pub async fn is_member(
        &self,
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<bool, DbErr> {
        Ok(club_member::Entity::find()
            .filter(club_member::Column::ClubId.eq(self.id))
            .filter(club_member::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{self, Role};
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn coordinator_is_enrolled_and_protected() {
        let db = setup_test_db().await;

        let coord = user::Model::create(&db, "Dr. Rao", "rao@uni.test", Role::Faculty, None)
            .await
            .unwrap();
        let member = user::Model::create(&db, "Asha", "asha@uni.test", Role::Student, None)
            .await
            .unwrap();

        let club = Model::create(&db, "Robotics Club", None, coord.id)
            .await
            .unwrap();

        assert!(club.is_member(&db, coord.id).await.unwrap());

        Model::add_member(&db, club.id, member.id).await.unwrap();
        // re-adding is a no-op
        Model::add_member(&db, club.id, member.id).await.unwrap();
        assert!(club.is_member(&db, member.id).await.unwrap());

        club.remove_member(&db, member.id).await.unwrap();
        assert!(!club.is_member(&db, member.id).await.unwrap());

        let err = club.remove_member(&db, coord.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(club.is_member(&db, coord.id).await.unwrap());
    }
}
