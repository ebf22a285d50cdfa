use std::time::Duration;

use axum::body::Body;
use axum::body::to_bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::observability;
use crate::routes;
use crate::state::AppState;
use forum_infra::config::AppConfig;

const COURSE: &str = "course-v1-demo";

fn test_config() -> AppConfig {
    AppConfig {
        app_env: "test".to_string(),
        port: 0,
        log_level: "info".to_string(),
        data_backend: "memory".to_string(),
        surreal_endpoint: "ws://127.0.0.1:8000".to_string(),
        surreal_ns: "forum".to_string(),
        surreal_db: "comments".to_string(),
        surreal_user: "root".to_string(),
        surreal_pass: "root".to_string(),
        default_per_page: 20,
        request_timeout_ms: 5_000,
    }
}

fn test_app() -> axum::Router {
    routes::router(AppState::in_memory(test_config()))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn create_thread(app: &axum::Router, commentable_id: &str, payload: Value) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/{commentable_id}/threads"),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["content_id"].as_str().expect("thread id").to_string()
}

fn thread_payload(user_id: &str, title: &str) -> Value {
    json!({
        "title": title,
        "body": format!("{title} body"),
        "course_id": COURSE,
        "user_id": user_id
    })
}

async fn comment(
    app: &axum::Router,
    thread_id: &str,
    user_id: &str,
    parent_id: Option<&str>,
) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/threads/{thread_id}/comments"),
        Some(json!({
            "body": "comment body",
            "user_id": user_id,
            "parent_id": parent_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["content_id"].as_str().expect("comment id").to_string()
}

fn collection_ids(body: &Value) -> Vec<String> {
    body["collection"]
        .as_array()
        .expect("collection")
        .iter()
        .map(|thread| thread["content_id"].as_str().expect("id").to_string())
        .collect()
}

async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn active_threads_are_ordered_by_latest_activity() {
    let app = test_app();

    let t1 = create_thread(&app, "unit-1", thread_payload("alice", "first")).await;
    tick().await;
    let t2 = create_thread(&app, "unit-1", thread_payload("bob", "second")).await;
    tick().await;
    comment(&app, &t2, "alice", None).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/alice/active_threads?course_id={COURSE}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collection_ids(&body), vec![t2.clone(), t1.clone()]);
    assert_eq!(body["page"], 1);
    assert_eq!(body["num_pages"], 1);
    assert_eq!(body["collection"][0]["comment_count"], 1);
    assert_eq!(body["collection"][0]["body"], "second body");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/alice/active_threads?course_id={COURSE}&page=2&per_page=1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collection_ids(&body), vec![t1]);
    assert_eq!(body["page"], 2);
    assert_eq!(body["num_pages"], 2);
}

#[tokio::test]
async fn active_threads_skip_anonymous_activity() {
    let app = test_app();

    let visible = create_thread(&app, "unit-2", thread_payload("carol", "visible")).await;
    tick().await;
    let mut hidden = thread_payload("carol", "hidden");
    hidden["anonymous_to_peers"] = json!(true);
    create_thread(&app, "unit-2", hidden).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/carol/active_threads?course_id={COURSE}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collection_ids(&body), vec![visible]);
}

#[tokio::test]
async fn active_threads_without_course_is_empty_object() {
    let app = test_app();
    create_thread(&app, "unit-3", thread_payload("dave", "thread")).await;

    let (status, body) = send(&app, "GET", "/api/v1/users/dave/active_threads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn active_threads_clamp_out_of_range_pages() {
    let app = test_app();
    let thread = create_thread(&app, "unit-4", thread_payload("erin", "only")).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/erin/active_threads?course_id={COURSE}&page=99&per_page=0"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collection_ids(&body), vec![thread]);
    assert_eq!(body["page"], 1);
    assert_eq!(body["num_pages"], 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/nobody/active_threads?course_id={COURSE}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection"], json!([]));
    assert_eq!(body["num_pages"], 1);
}

#[tokio::test]
async fn active_threads_reject_non_numeric_paging() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/frank/active_threads?course_id={COURSE}&page=two"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn social_stats_tally_content_and_followers() {
    let app = test_app();

    let mut own = thread_payload("grace", "own thread");
    own["auto_subscribe"] = json!(true);
    let own_thread = create_thread(&app, "unit-5", own).await;
    let other_thread = create_thread(&app, "unit-5", thread_payload("heidi", "other")).await;

    let heidi_comment = comment(&app, &own_thread, "heidi", None).await;
    comment(&app, &other_thread, "grace", None).await;
    comment(&app, &own_thread, "grace", Some(&heidi_comment)).await;

    for follower in ["heidi", "ivan", "heidi"] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/users/{follower}/subscriptions"),
            Some(json!({"source_type": "thread", "source_id": own_thread})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/users/grace/social_stats?course_id={COURSE}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "num_threads": 1,
            "num_comments": 1,
            "num_replies": 1,
            "num_upvotes": 0,
            "num_downvotes": 0,
            "num_flagged": 0,
            "num_thread_followers": 2,
            "num_comments_generated": 2
        })
    );
}

#[tokio::test]
async fn social_stats_without_course_is_empty_object() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/v1/users/judy/social_stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn subscriptions_only_accept_threads() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/kim/subscriptions",
        Some(json!({"source_type": "commentable", "source_id": "unit-6"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn user_routes_create_read_and_update() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some(json!({"id": "42", "username": "leo"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "42");
    assert_eq!(body["default_sort_key"], "date");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some(json!({"id": "42", "username": "leo"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, body) = send(&app, "GET", "/api/v1/users/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "leo");

    let (status, _) = send(&app, "GET", "/api/v1/users/43", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/users/43",
        Some(json!({"username": "mia", "default_sort_key": "votes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "43");
    assert_eq!(body["default_sort_key"], "votes");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/users/43",
        Some(json!({"default_sort_key": "random"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn commentable_threads_filter_by_group_and_delete() {
    let app = test_app();

    let mut grouped = thread_payload("nina", "grouped");
    grouped["group_id"] = json!(7);
    let grouped = create_thread(&app, "unit-7", grouped).await;
    let mut other_group = thread_payload("nina", "other group");
    other_group["group_id"] = json!(8);
    create_thread(&app, "unit-7", other_group).await;
    let open = create_thread(&app, "unit-7", thread_payload("nina", "open")).await;
    create_thread(&app, "unit-8", thread_payload("nina", "elsewhere")).await;

    let (status, body) = send(&app, "GET", "/api/v1/unit-7/threads?group_id=7", None).await;
    assert_eq!(status, StatusCode::OK);
    let mut ids: Vec<String> = body
        .as_array()
        .expect("threads")
        .iter()
        .map(|thread| thread["content_id"].as_str().expect("id").to_string())
        .collect();
    ids.sort();
    let mut expected = vec![grouped, open];
    expected.sort();
    assert_eq!(ids, expected);

    let (status, body) = send(&app, "GET", "/api/v1/unit-7/threads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    let (status, body) = send(&app, "DELETE", "/api/v1/unit-7/threads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 3);

    let (_, body) = send(&app, "GET", "/api/v1/unit-7/threads", None).await;
    assert_eq!(body, json!([]));
    let (_, body) = send(&app, "GET", "/api/v1/unit-8/threads", None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn thread_creation_validates_payload() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/unit-9/threads",
        Some(json!({"title": "", "body": "b", "course_id": COURSE, "user_id": "oscar"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn comment_on_missing_thread_is_not_found() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/threads/missing/comments",
        Some(json!({"body": "hello", "user_id": "pat"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn health_reports_store_backend() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["store"]["backend"], "memory");
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("x-correlation-id", "corr-123")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-correlation-id")
            .and_then(|value| value.to_str().ok()),
        Some("corr-123")
    );
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn metrics_endpoint_is_exposed() {
    let _ = observability::init_metrics();
    let app = test_app();

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/plain"))
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = String::from_utf8(body.to_vec()).expect("metrics body");
    assert!(body.contains("forum_api_http_requests_total"));
}
