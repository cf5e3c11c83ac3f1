//! HTTP routing integration tests

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use helpers::{setup_world, TestWorld};
use http_body_util::BodyExt;
use pms_review::build_router;
use pms_review::db::sessions;
use async_trait::async_trait;
use pms_review::services::IdentityResolver;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn app(world: &TestWorld) -> Router {
    build_router(world.state.clone())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn submit_body(world: &TestWorld) -> Value {
    json!({
        "performanceId": world.record.id,
        "quarter": "Q1",
        "kind": "agreement",
        "actorId": world.alice.id,
    })
}

#[tokio::test]
async fn test_health() {
    let world = setup_world().await.unwrap();

    let response = app(&world).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "pms-review");
    assert_eq!(body["connected_users"], 0);
}

#[tokio::test]
async fn test_named_action_returns_ok() {
    let world = setup_world().await.unwrap();

    let response = app(&world)
        .oneshot(post_json("/workflow/submit", submit_body(&world)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));
    assert_eq!(world.state.notifications.unread_count(world.bob.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_action_in_body() {
    let world = setup_world().await.unwrap();
    let mut body = submit_body(&world);
    body["action"] = json!("submit");

    let response = app(&world).oneshot(post_json("/workflow", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_action_is_bad_request() {
    let world = setup_world().await.unwrap();

    let response = app(&world)
        .oneshot(post_json("/workflow", submit_body(&world)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("action"));
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let world = setup_world().await.unwrap();

    for field in ["performanceId", "quarter", "kind", "actorId"] {
        let mut body = submit_body(&world);
        body.as_object_mut().unwrap().remove(field);

        let response = app(&world)
            .oneshot(post_json("/workflow/submit", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "without {}", field);
    }
}

#[tokio::test]
async fn test_unknown_action_is_bad_request() {
    let world = setup_world().await.unwrap();

    let response = app(&world)
        .oneshot(post_json("/workflow/archive", submit_body(&world)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_illegal_transition_is_bad_request() {
    let world = setup_world().await.unwrap();
    let mut body = submit_body(&world);
    body["actorId"] = json!(world.bob.id);

    let response = app(&world)
        .oneshot(post_json("/workflow/approve", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let world = setup_world().await.unwrap();
    let mut body = submit_body(&world);
    body["performanceId"] = json!(uuid::Uuid::new_v4());

    let response = app(&world)
        .oneshot(post_json("/workflow/submit", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_and_mark_read() {
    let world = setup_world().await.unwrap();
    let app = app(&world);
    app.clone()
        .oneshot(post_json("/workflow/submit", submit_body(&world)))
        .await
        .unwrap();

    // List
    let response = app
        .clone()
        .oneshot(get(&format!("/notifications?recipientId={}", world.bob.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    let items = list.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["senderName"], "Alice");
    assert_eq!(items[0]["cycle"], 2026);
    assert_eq!(items[0]["isRead"], false);
    let id = items[0]["id"].as_str().unwrap().to_string();

    // Someone else cannot mark it read
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/notifications/{}/read?recipientId={}", id, world.carol.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The recipient can
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/notifications/{}/read?recipientId={}", id, world.bob.id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!(
            "/notifications/unread-count?recipientId={}",
            world.bob.id
        )))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["count"], 0);
}

#[tokio::test]
async fn test_read_all() {
    let world = setup_world().await.unwrap();
    let app = app(&world);
    for kind in ["agreement", "assessment"] {
        let mut body = submit_body(&world);
        body["kind"] = json!(kind);
        app.clone()
            .oneshot(post_json("/workflow/submit", body))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(post_json(
            &format!("/notifications/read-all?recipientId={}", world.bob.id),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(body_json(response).await["updated"], 2);
    assert_eq!(world.state.notifications.unread_count(world.bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stream_requires_known_token() {
    let world = setup_world().await.unwrap();

    let response = app(&world)
        .oneshot(get("/notifications/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/notifications/stream")
        .header(header::AUTHORIZATION, "Bearer not-a-session")
        .body(Body::empty())
        .unwrap();
    let response = app(&world).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!world.state.registry.is_connected(world.bob.id));
}

#[tokio::test]
async fn test_stream_opens_channel_until_dropped() {
    let world = setup_world().await.unwrap();
    let token = sessions::create_session(world.db(), world.bob.id, None)
        .await
        .unwrap();

    let response = app(&world)
        .oneshot(get(&format!("/notifications/stream?token={}", token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert!(world.state.registry.is_connected(world.bob.id));

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: ConnectionStatus"));
    assert!(text.contains("data: connected"));

    drop(body);
    assert!(!world.state.registry.is_connected(world.bob.id));
}

/// Accepts one fixed token, for a single user
struct FixedIdentity {
    token: &'static str,
    user_id: Uuid,
}

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn resolve(&self, token: &str) -> Option<Uuid> {
        (token == self.token).then_some(self.user_id)
    }
}

#[tokio::test]
async fn test_stream_uses_configured_identity_resolver() {
    let world = setup_world().await.unwrap();
    let state = world.state.clone().with_identity(Arc::new(FixedIdentity {
        token: "sso-token",
        user_id: world.carol.id,
    }));

    let request = Request::builder()
        .uri("/notifications/stream")
        .header(header::AUTHORIZATION, "Bearer sso-token")
        .body(Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.registry.is_connected(world.carol.id));

    // Session tokens are no longer consulted
    let session = sessions::create_session(world.db(), world.bob.id, None)
        .await
        .unwrap();
    let response = build_router(state)
        .oneshot(get(&format!("/notifications/stream?token={}", session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sweep_endpoint_reports() {
    let world = setup_world().await.unwrap();

    let response = app(&world)
        .oneshot(post_json("/reminders/sweep?at=2026-03-29T09:00:00Z", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["itemsConsidered"], 0);
    assert_eq!(report["remindersSent"], 0);
    assert_eq!(report["remindersFailed"], 0);
}
