//! HTTP surface tests: status codes and JSON bodies through the full router.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use explore_api::{create_api_router, AppState};
use explore_storage::ReadThroughCache;
use explore_test_utils::fixtures::{instrumented, liker_id, seed_likers};
use explore_test_utils::CountingDecisionStore;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(store: Arc<CountingDecisionStore>) -> Router {
    let (_, cache) = instrumented();
    create_api_router(AppState::new(store, ReadThroughCache::with_defaults(cache)))
}

async fn post(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn post_raw(app: Router, path: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_list_liked_you_returns_newest_first() {
    let (store, _) = instrumented();
    seed_likers(store.inner(), "user123", &[100, 300, 200]).await;

    let (status, body) = post(
        app(store),
        "/explore/v1/list-liked-you",
        json!({ "recipient_user_id": "user123" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let likers = body["likers"].as_array().unwrap();
    assert_eq!(likers.len(), 3);
    assert_eq!(likers[0]["actor_id"], liker_id(300));
    assert_eq!(likers[0]["unix_timestamp"], 300);
    assert_eq!(likers[2]["unix_timestamp"], 100);
    assert!(body.get("next_pagination_token").is_none());
}

#[tokio::test]
async fn test_empty_token_is_first_page() {
    let (store, _) = instrumented();
    seed_likers(store.inner(), "R", &[10]).await;

    let (status, body) = post(
        app(store),
        "/explore/v1/list-new-liked-you",
        json!({ "recipient_user_id": "R", "pagination_token": "" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likers"][0]["actor_id"], liker_id(10));
}

#[tokio::test]
async fn test_malformed_token_is_bad_request() {
    let (store, _) = instrumented();

    let (status, body) = post(
        app(store.clone()),
        "/explore/v1/list-liked-you",
        json!({ "recipient_user_id": "R", "pagination_token": "%%%" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAGINATION_TOKEN");
    assert_eq!(store.calls.reads(), 0);
}

#[tokio::test]
async fn test_missing_recipient_is_bad_request() {
    let (store, _) = instrumented();

    let (status, body) = post(app(store), "/explore/v1/count-liked-you", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "recipient_user_id is required");
}

#[tokio::test]
async fn test_put_decision_reports_mutual_like() {
    let (store, _) = instrumented();
    let app = app(store);

    let (status, body) = post(
        app.clone(),
        "/explore/v1/put-decision",
        json!({ "actor_user_id": "a", "recipient_user_id": "b", "liked_recipient": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mutual_likes"], false);

    let (status, body) = post(
        app.clone(),
        "/explore/v1/put-decision",
        json!({ "actor_user_id": "b", "recipient_user_id": "a", "liked_recipient": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mutual_likes"], true);

    let (status, body) = post(
        app,
        "/explore/v1/count-liked-you",
        json!({ "recipient_user_id": "a" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_same_identity_is_bad_request() {
    let (store, _) = instrumented();

    let (status, body) = post(
        app(store),
        "/explore/v1/put-decision",
        json!({ "actor_user_id": "a", "recipient_user_id": "a", "liked_recipient": true }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_mistyped_field_is_invalid_input() {
    let (store, _) = instrumented();

    let (status, body) = post(
        app(store.clone()),
        "/explore/v1/put-decision",
        json!({ "actor_user_id": "a", "recipient_user_id": "b", "liked_recipient": "yes" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid request body"));
    assert_eq!(
        store.calls.upsert_decision.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_unparseable_body_is_invalid_input() {
    let (store, _) = instrumented();

    let (status, body) = post_raw(app(store), "/explore/v1/list-liked-you", "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_missing_content_type_is_invalid_input() {
    let (store, _) = instrumented();
    let request = Request::builder()
        .method("POST")
        .uri("/explore/v1/count-liked-you")
        .body(Body::from(r#"{"recipient_user_id":"R"}"#))
        .unwrap();

    let (status, body) = send(app(store), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let (store, _) = instrumented();
    store.fail_upsert(true);

    let (status, body) = post(
        app(store),
        "/explore/v1/put-decision",
        json!({ "actor_user_id": "a", "recipient_user_id": "b", "liked_recipient": true }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "failed to create decision");
}

#[tokio::test]
async fn test_health_endpoints() {
    let (store, _) = instrumented();
    let app = app(store);

    let (status, body) = get(app.clone(), "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["store"]["status"], "healthy");
    assert!(body["details"]["cache_stats"].is_object());
}
