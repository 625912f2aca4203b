//! HTTP surface tests.
//!
//! Drives the real router with `tower::ServiceExt::oneshot`, asserting
//! status codes, the response envelope, and bearer-token handling.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use jobboard_core::api::{build_router, AppState};
use jobboard_core::auth::TokenService;
use jobboard_core::lifecycle::LifecycleController;
use jobboard_core::notify::StoreNotifier;
use jobboard_core::service::BoardService;
use jobboard_core::store::{MemoryStore, Store};

fn app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let notifier = Arc::new(StoreNotifier::new(store.clone()));
    let service = Arc::new(BoardService::new(
        store,
        LifecycleController::lax(),
        notifier,
    ));
    let tokens = Arc::new(TokenService::new("test-secret", Duration::hours(1)));
    build_router(AppState { service, tokens })
}

fn post(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Register a user and return their bearer token.
async fn register(app: &Router, username: &str, role: &str) -> String {
    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/auth/register",
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "hunter2hunter2",
                "role": role,
            }),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["token"].as_str().expect("token").to_string()
}

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(get("/health", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_rejects_unknown_role() {
    let response = app()
        .oneshot(post(
            "/api/v1/auth/register",
            json!({
                "username": "eve",
                "email": "eve@example.com",
                "password": "hunter2hunter2",
                "role": "superuser",
            }),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_flow() {
    let app = app();
    register(&app, "alice", "job_seeker").await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/auth/login",
            json!({ "username": "alice", "password": "hunter2hunter2" }),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["role"], "job_seeker");
    assert!(body["data"]["token"].as_str().is_some());

    let response = app
        .oneshot(post(
            "/api/v1/auth/login",
            json!({ "username": "alice", "password": "wrong" }),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_legacy_role_spelling_accepted() {
    let app = app();
    // Older clients send "jobseeker" without the underscore.
    register(&app, "legacy", "jobseeker").await;
}

#[tokio::test]
async fn test_garbage_bearer_token_rejected() {
    let response = app()
        .oneshot(get("/api/v1/jobs", Some("not-a-jwt")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_anonymous_job_posting_rejected() {
    let response = app()
        .oneshot(post(
            "/api/v1/jobs",
            json!({ "title": "Role", "description": "Work" }),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_job_board_flow_over_http() {
    let app = app();
    let employer = register(&app, "acme", "employer").await;
    let seeker = register(&app, "alice", "job_seeker").await;

    // Employer posts a job.
    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/jobs",
            json!({
                "title": "Backend Engineer",
                "description": "Ship features",
                "location": "Remote",
            }),
            Some(&employer),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let job_id = body["data"]["id"].as_str().expect("job id").to_string();

    // The job shows up on the public board.
    let response = app
        .clone()
        .oneshot(get("/api/v1/jobs", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().expect("list").len(), 1);

    // Seeker applies.
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/jobs/{job_id}/apply"),
            json!({ "cover_letter": "Hire me" }),
            Some(&seeker),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let app_id = body["data"]["id"].as_str().expect("app id").to_string();

    // Applying twice conflicts.
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/jobs/{job_id}/apply"),
            json!({}),
            Some(&seeker),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ALREADY_APPLIED");

    // Employer shortlists the application.
    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/applications/{app_id}/status"),
            json!({ "status": "shortlisted" }),
            Some(&employer),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "shortlisted");

    // The applicant saw the update in their inbox.
    let response = app
        .clone()
        .oneshot(get("/api/v1/notifications", Some(&seeker)))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().expect("inbox").len(), 1);

    // Seeker withdraws.
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/applications/{app_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {seeker}"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "withdrawn");
}

#[tokio::test]
async fn test_hidden_job_reads_as_404_over_http() {
    let app = app();
    let employer = register(&app, "acme", "employer").await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/jobs",
            json!({ "title": "Quiet role", "description": "Shh" }),
            Some(&employer),
        ))
        .await
        .expect("response");
    let body = body_json(response).await;
    let job_id = body["data"]["id"].as_str().expect("job id").to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/jobs/{job_id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {employer}"))
                .body(Body::from(json!({ "status": "closed" }).to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    // Anonymous readers cannot tell it apart from a missing job.
    let response = app
        .oneshot(get(&format!("/api/v1/jobs/{job_id}"), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "RECORD_NOT_FOUND");
}
