use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, Set};

use crate::error::{DomainError, is_unique_violation};

/// Club membership rows. The composite primary key gives the member list
/// set semantics: a user appears in a club at most once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "club_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub club_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    pub joined_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::club::Entity",
        from = "Column::ClubId",
        to = "super::club::Column::Id"
    )]
    Club,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::club::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) async fn add(
        db: &DatabaseConnection,
        club_id: i64,
        user_id: i64,
    ) -> Result<(), DomainError> {
        let row = ActiveModel {
            club_id: Set(club_id),
            user_id: Set(user_id),
            joined_at: Set(Utc::now()),
        };
        match row.insert(db).await {
            Ok(_) => Ok(()),
            // membership is a set: duplicate adds are fine
            Err(e) if is_unique_violation(&e) => Ok(()),
            Err(e) => Err(DomainError::Db(e)),
        }
    }
}
