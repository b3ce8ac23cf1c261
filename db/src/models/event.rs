use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Represents an event in the `events` table.
///
/// The embedded QR session lives in the three `qr_*` columns. An event has
/// at most one active session; generating a new one overwrites the previous
/// token in place, which implicitly invalidates it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// `None` means unlimited capacity.
    pub max_capacity: Option<i32>,
    pub club_id: i64,
    pub organizer_id: i64,
    pub is_active: bool,
    pub qr_token: Option<String>,
    pub qr_expires_at: Option<DateTime<Utc>>,
    pub qr_created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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
        from = "Column::OrganizerId",
        to = "super::user::Column::Id"
    )]
    Organizer,
    #[sea_orm(has_many = "super::registration::Entity")]
    Registrations,
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
}

impl Related<super::club::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registrations.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The active proof-of-presence session for an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_by: i64,
}

/// The literal JSON payload encoded into the QR image.
///
/// A scanner posts this string back verbatim, so it is self-describing:
/// the client never needs to know the event id in advance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub event_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl QrPayload {
    pub const KIND_ATTENDANCE: &'static str = "attendance";

    pub fn new(event_id: i64, session: &QrSession) -> Self {
        Self {
            event_id: event_id.to_string(),
            token: session.token.clone(),
            expires_at: session.expires_at,
            kind: Self::KIND_ATTENDANCE.to_string(),
        }
    }
}

/// Outcome of checking a submitted token against an event's stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrTokenStatus {
    Valid,
    /// Token matches the stored session but its validity window has passed.
    Expired,
    /// No session, or the token does not match the current one (a newer
    /// generation supersedes older tokens immediately).
    Invalid,
}

impl Model {
    /// Creates a new event record.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DatabaseConnection,
        title: &str,
        club_id: i64,
        organizer_id: i64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        max_capacity: Option<i32>,
        location: Option<&str>,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let event = ActiveModel {
            title: Set(title.to_owned()),
            description: Set(None),
            location: Set(location.map(|s| s.to_owned())),
            start_date: Set(start_date),
            end_date: Set(end_date),
            max_capacity: Set(max_capacity),
            club_id: Set(club_id),
            organizer_id: Set(organizer_id),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        event.insert(db).await
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<Self>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Returns the event's current QR session, if one has ever been issued.
    ///
    /// Expiry is NOT checked here; an expired session is still "the current
    /// one" until the next generation overwrites it.
    pub fn qr_session(&self) -> Option<QrSession> {
        match (&self.qr_token, self.qr_expires_at, self.qr_created_by) {
            (Some(token), Some(expires_at), Some(created_by)) => Some(QrSession {
                token: token.clone(),
                expires_at,
                created_by,
            }),
            _ => None,
        }
    }

    /// Issues a fresh QR session for the event, replacing any previous one.
    ///
    /// The three session columns are written in a single field-level UPDATE:
    /// concurrent generations are last-writer-wins and never see a torn
    /// session. The previous token becomes invalid the moment this commits.
    pub async fn issue_qr_session(
        db: &DatabaseConnection,
        event_id: i64,
        created_by: i64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<QrSession, DomainError> {
        let token = generate_token();
        let expires_at = now + ttl;

        let res = Entity::update_many()
            .col_expr(Column::QrToken, Expr::value(token.clone()))
            .col_expr(Column::QrExpiresAt, Expr::value(expires_at))
            .col_expr(Column::QrCreatedBy, Expr::value(created_by))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(event_id))
            .exec(db)
            .await?;

        if res.rows_affected == 0 {
            return Err(DomainError::NotFound("Event not found".into()));
        }

        Ok(QrSession {
            token,
            expires_at,
            created_by,
        })
    }

    /// Checks a submitted token against the stored session.
    ///
    /// Both checks are mandatory: an expired-but-matching token is
    /// `Expired`, and a non-expired-but-mismatched token (superseded by a
    /// newer generation) is `Invalid`.
    pub fn qr_token_status(&self, token: &str, now: DateTime<Utc>) -> QrTokenStatus {
        let Some(session) = self.qr_session() else {
            return QrTokenStatus::Invalid;
        };
        if session.token != token {
            return QrTokenStatus::Invalid;
        }
        if now >= session.expires_at {
            return QrTokenStatus::Expired;
        }
        QrTokenStatus::Valid
    }

    /// True iff `token` matches the current session and has not expired.
    pub fn validate_qr_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.qr_token_status(token, now) == QrTokenStatus::Valid
    }
}

/// 32 random bytes, hex-encoded: the opaque proof-of-presence secret.
fn generate_token() -> String {
    use rand::RngCore;
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{club, user, user::Role};
    use crate::test_utils::setup_test_db;
    use chrono::TimeZone;

    async fn seed_event(db: &DatabaseConnection) -> Model {
        let coord = user::Model::create(db, "Dr. Iyer", "iyer@uni.test", Role::Faculty, None)
            .await
            .unwrap();
        let club = club::Model::create(db, "Chess Club", None, coord.id)
            .await
            .unwrap();
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 14, 0, 0).unwrap();
        Model::create(
            db,
            "Opening Night",
            club.id,
            coord.id,
            start,
            start + Duration::hours(2),
            None,
            Some("Hall B"),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn token_is_valid_within_window_and_expires_after() {
        let db = setup_test_db().await;
        let event = seed_event(&db).await;

        let issued_at = Utc.with_ymd_and_hms(2026, 9, 1, 14, 5, 0).unwrap();
        let session =
            Model::issue_qr_session(&db, event.id, event.organizer_id, issued_at, Duration::minutes(30))
                .await
                .unwrap();

        let event = Model::find_by_id(&db, event.id).await.unwrap().unwrap();
        assert!(event.validate_qr_token(&session.token, issued_at + Duration::minutes(29)));
        assert!(!event.validate_qr_token(&session.token, issued_at + Duration::minutes(31)));
        assert_eq!(
            event.qr_token_status(&session.token, issued_at + Duration::minutes(31)),
            QrTokenStatus::Expired
        );
    }

    #[tokio::test]
    async fn regeneration_invalidates_previous_token_immediately() {
        let db = setup_test_db().await;
        let event = seed_event(&db).await;

        let issued_at = Utc.with_ymd_and_hms(2026, 9, 1, 14, 5, 0).unwrap();
        let first =
            Model::issue_qr_session(&db, event.id, event.organizer_id, issued_at, Duration::minutes(30))
                .await
                .unwrap();
        let second = Model::issue_qr_session(
            &db,
            event.id,
            event.organizer_id,
            issued_at + Duration::minutes(1),
            Duration::minutes(30),
        )
        .await
        .unwrap();
        assert_ne!(first.token, second.token);

        // well before the first token's natural expiry
        let now = issued_at + Duration::minutes(2);
        let event = Model::find_by_id(&db, event.id).await.unwrap().unwrap();
        assert_eq!(event.qr_token_status(&first.token, now), QrTokenStatus::Invalid);
        assert_eq!(event.qr_token_status(&second.token, now), QrTokenStatus::Valid);
    }

    #[tokio::test]
    async fn issue_for_missing_event_is_not_found() {
        let db = setup_test_db().await;
        let err = Model::issue_qr_session(&db, 999, 1, Utc::now(), Duration::minutes(30))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn payload_round_trips_with_wire_field_names() {
        let session = QrSession {
            token: "ab".repeat(32),
            expires_at: Utc.with_ymd_and_hms(2026, 9, 1, 14, 35, 0).unwrap(),
            created_by: 7,
        };
        let payload = QrPayload::new(42, &session);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"eventId\":\"42\""));
        assert!(json.contains("\"type\":\"attendance\""));
        assert!(json.contains("\"expiresAt\""));

        let back: QrPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token, payload.token);
        assert_eq!(back.kind, QrPayload::KIND_ATTENDANCE);
    }
}
