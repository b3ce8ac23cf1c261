mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use api::auth::generate_jwt;
use db::models::registration::{self, ParticipantType, Status as RegStatus};
use db::models::user::{self, Role};
use db::models::{attendance, event};

use helpers::app::{make_test_app, seed_basic};

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Generates a QR session over HTTP as `requester` and returns the body.
async fn generate_qr(app: &axum::Router, event_id: i64, requester_id: i64) -> (StatusCode, Value) {
    let (token, _) = generate_jwt(requester_id, Role::Faculty);
    let uri = format!("/api/attendance/qr/generate/{}", event_id);
    let resp = app
        .clone()
        .oneshot(json_request("POST", &uri, &token, serde_json::json!({})))
        .await
        .unwrap();
    let status = resp.status();
    (status, response_json(resp).await)
}

#[tokio::test]
async fn test_generate_qr_as_coordinator() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    let (status, json) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let qr_code_url = json["data"]["qr_code_url"].as_str().unwrap();
    assert!(qr_code_url.starts_with("data:image/svg+xml;base64,"));

    // the payload is self-describing: event id, token, expiry, type
    let payload: Value =
        serde_json::from_str(json["data"]["qr_data"].as_str().unwrap()).unwrap();
    assert_eq!(payload["eventId"], ctx.event.id.to_string());
    assert_eq!(payload["type"], "attendance");
    assert_eq!(payload["token"].as_str().unwrap().len(), 64);

    // session is stored on the event with a ~30 minute window
    let stored = event::Model::find_by_id(state.db(), ctx.event.id)
        .await
        .unwrap()
        .unwrap();
    let session = stored.qr_session().expect("session stored");
    assert_eq!(session.token, payload["token"].as_str().unwrap());
    let remaining = session.expires_at - Utc::now();
    assert!(remaining > Duration::minutes(29) && remaining <= Duration::minutes(30));
}

#[tokio::test]
async fn test_generate_qr_forbidden_for_non_coordinator_faculty() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    let (status, json) = generate_qr(&app, ctx.event.id, ctx.other_faculty.id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["message"].as_str().unwrap().contains("coordinator"));
}

#[tokio::test]
async fn test_generate_qr_forbidden_for_student() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    let (token, _) = generate_jwt(ctx.student.id, Role::Student);
    let uri = format!("/api/attendance/qr/generate/{}", ctx.event.id);
    let resp = app
        .oneshot(json_request("POST", &uri, &token, serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_generate_qr_unknown_event_is_404() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    let (status, _) = generate_qr(&app, 424242, ctx.coordinator.id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scan_marks_attendance_and_rescan_conflicts() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    registration::Model::register(
        state.db(),
        ctx.student.id,
        ctx.event.id,
        ParticipantType::ClubMember,
    )
    .await
    .unwrap();

    let (_, generated) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;
    let qr_data = generated["data"]["qr_data"].as_str().unwrap().to_string();

    let (token, _) = generate_jwt(ctx.student.id, Role::Student);
    let body = serde_json::json!({ "qr_data": qr_data });

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &token,
            body.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let json = response_json(resp).await;
    assert_eq!(json["data"]["status"], "present");
    assert_eq!(json["data"]["marked_by"], ctx.student.id);

    let reg = registration::Model::find_for(state.db(), ctx.student.id, ctx.event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reg.status, RegStatus::Attended);

    // a second scan is an explicit conflict and leaves the record alone
    let resp = app
        .oneshot(json_request("POST", "/api/attendance/qr/mark", &token, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let json = response_json(resp).await;
    assert!(json["message"].as_str().unwrap().contains("already marked"));

    let count = attendance::Model::count_for_user(state.db(), ctx.student.id)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_scan_without_registration_conflicts_and_creates_nothing() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    let (_, generated) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;
    let qr_data = generated["data"]["qr_data"].as_str().unwrap().to_string();

    let (token, _) = generate_jwt(ctx.student.id, Role::Student);
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &token,
            serde_json::json!({ "qr_data": qr_data }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let json = response_json(resp).await;
    assert!(json["message"].as_str().unwrap().contains("not registered"));

    assert!(
        attendance::Model::find_for(state.db(), ctx.student.id, ctx.event.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_scan_with_malformed_payload_is_400() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    let (token, _) = generate_jwt(ctx.student.id, Role::Student);
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &token,
            serde_json::json!({ "qr_data": "not json at all" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scan_with_wrong_payload_type_is_400() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    registration::Model::register(
        state.db(),
        ctx.student.id,
        ctx.event.id,
        ParticipantType::ClubMember,
    )
    .await
    .unwrap();

    let (_, generated) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;
    let mut payload: Value =
        serde_json::from_str(generated["data"]["qr_data"].as_str().unwrap()).unwrap();
    payload["type"] = Value::String("checkin".into());

    let (token, _) = generate_jwt(ctx.student.id, Role::Student);
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &token,
            serde_json::json!({ "qr_data": payload.to_string() }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regenerating_invalidates_previous_qr_image() {
    let (app, state) = make_test_app().await;
    let ctx = seed_basic(state.db(), None).await;

    registration::Model::register(
        state.db(),
        ctx.student.id,
        ctx.event.id,
        ParticipantType::ClubMember,
    )
    .await
    .unwrap();

    let (_, first) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;
    let stale = first["data"]["qr_data"].as_str().unwrap().to_string();

    // second generation supersedes the first token before its expiry
    let (_, _second) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;

    let (token, _) = generate_jwt(ctx.student.id, Role::Student);
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &token,
            serde_json::json!({ "qr_data": stale }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let json = response_json(resp).await;
    assert!(json["message"].as_str().unwrap().contains("Invalid"));
}

#[tokio::test]
async fn test_end_to_end_capacity_qr_and_rescan() {
    let (app, state) = make_test_app().await;
    // coordinator F, club C, event E with capacity 1
    let ctx = seed_basic(state.db(), Some(1)).await;

    // student S registers
    let (s_token, _) = generate_jwt(ctx.student.id, Role::Student);
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/registrations/register",
            &s_token,
            serde_json::json!({ "event_id": ctx.event.id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // student S2 is refused: capacity full
    let s2 = user::Model::create(state.db(), "Dev", "dev@uni.test", Role::Student, None)
        .await
        .unwrap();
    let (s2_token, _) = generate_jwt(s2.id, Role::Student);
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/registrations/register",
            &s2_token,
            serde_json::json!({ "event_id": ctx.event.id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // F generates a QR token for E
    let (status, generated) = generate_qr(&app, ctx.event.id, ctx.coordinator.id).await;
    assert_eq!(status, StatusCode::OK);
    let qr_data = generated["data"]["qr_data"].as_str().unwrap().to_string();

    // S scans: attendance present, registration attended
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &s_token,
            serde_json::json!({ "qr_data": qr_data.clone() }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let record = attendance::Model::find_for(state.db(), ctx.student.id, ctx.event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, attendance::Status::Present);
    let reg = registration::Model::find_for(state.db(), ctx.student.id, ctx.event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reg.status, RegStatus::Attended);

    // S scans again: conflict
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/attendance/qr/mark",
            &s_token,
            serde_json::json!({ "qr_data": qr_data }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
