use axum::Router;
use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;
use util::{config::AppConfig, state::AppState};

use db::models::user::Role;
use db::models::{club, event, user};

/// Builds the real router against a fresh in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    AppConfig::set_jwt_secret("test-secret");
    AppConfig::set_jwt_duration_minutes(60);

    let db = db::test_utils::setup_test_db().await;
    let state = AppState::new(db);
    let app = Router::new().nest("/api", api::routes::routes(state.clone()));
    (app, state)
}

/// One club with its coordinator, a second unrelated faculty member, a
/// student, and an upcoming event under the club.
pub struct TestCtx {
    pub coordinator: user::Model,
    pub other_faculty: user::Model,
    pub student: user::Model,
    pub club: club::Model,
    pub event: event::Model,
}

pub async fn seed_basic(db: &DatabaseConnection, max_capacity: Option<i32>) -> TestCtx {
    let coordinator = user::Model::create(
        db,
        "Dr. Anand",
        "anand@uni.test",
        Role::Faculty,
        Some("Computer Science"),
    )
    .await
    .expect("create coordinator");

    let other_faculty = user::Model::create(
        db,
        "Dr. Bose",
        "bose@uni.test",
        Role::Faculty,
        Some("Physics"),
    )
    .await
    .expect("create other faculty");

    let student = user::Model::create(db, "Meera", "meera@uni.test", Role::Student, None)
        .await
        .expect("create student");

    let club = club::Model::create(db, "Astronomy Society", None, coordinator.id)
        .await
        .expect("create club");

    let start = Utc::now() + Duration::days(2);
    let event = event::Model::create(
        db,
        "Star Party",
        club.id,
        coordinator.id,
        start,
        start + Duration::hours(4),
        max_capacity,
        Some("Observatory Lawn"),
    )
    .await
    .expect("create event");

    TestCtx {
        coordinator,
        other_faculty,
        student,
        club,
        event,
    }
}
