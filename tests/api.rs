mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use meeting_actions::api::AppState;
use meeting_actions::routes::create_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(models: Value) -> Router {
    let store = store_with(models);
    create_router().with_state(Arc::new(AppState::new(store)))
}

async fn post(app: Router, uri: &str, user_id: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn meeting() -> Value {
    json!({
        "committee/1": {"meeting_ids": [22]},
        "meeting/22": {"committee_id": 1, "group_ids": [111]},
        "group/111": {"name": "name_srtgb123", "meeting_id": 22},
    })
}

#[tokio::test]
async fn test_action_request() {
    let (status, body) = post(
        app(meeting()),
        "/system/action/handle_request",
        Some("1"),
        json!([{"action": "group.delete", "data": [{"id": 111}]}]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["results"], json!([[null]]));
}

#[tokio::test]
async fn test_action_errors_carry_status_code() {
    let (status, body) = post(
        app(meeting()),
        "/system/action/handle_request",
        Some("1"),
        json!([{"action": "group.delete", "data": [{"id": 112}]}]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "status_code": 400, "message": "Model 'group/112' does not exist."})
    );

    let (status, body) = post(
        app(meeting()),
        "/system/action/handle_request",
        None,
        json!([{"action": "group.delete", "data": [{"id": 111}]}]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status_code"], json!(403));

    let (status, body) = post(
        app(meeting()),
        "/system/action/handle_request",
        Some("1"),
        json!([{"action": "group.explode", "data": [{"id": 111}]}]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Action group.explode does not exist."));
}

#[tokio::test]
async fn test_invalid_user_header() {
    let (status, _) = post(
        app(meeting()),
        "/system/action/handle_request",
        Some("admin"),
        json!([{"action": "group.delete", "data": [{"id": 111}]}]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_presenter_request() {
    let (status, body) = post(
        app(json!({"user/2": {"username": "user2", "email": "user2@test.de"}})),
        "/system/presenter/handle_request",
        Some("1"),
        json!([{
            "presenter": "search_users",
            "data": {"permission_type": "organization", "permission_id": 1, "search": [{"username": "USER2"}]},
        }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([[[{"id": 2, "username": "user2", "email": "user2@test.de"}]]])
    );
}
