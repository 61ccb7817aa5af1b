//! Integration tests for the frontdesk-sv HTTP API
//!
//! Drives the axum router directly with `oneshot` against a temporary
//! SQLite database seeded with the initial knowledge entries.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use frontdesk_sv::models::{HelpRequest, RequestStatus};
use frontdesk_sv::notify::LogSink;
use frontdesk_sv::resolver::ResolverConfig;
use frontdesk_sv::{build_router, db, AppState};

/// Test helper: fresh database in a temp dir, seeded, wrapped in a router
async fn setup_app() -> (axum::Router, sqlx::SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = db::init_database_pool(&dir.path().join("frontdesk.db"))
        .await
        .expect("Should open test database");
    db::seed_knowledge(&pool).await.expect("Should seed knowledge");

    let state = AppState::new(
        pool.clone(),
        Arc::new(LogSink),
        ResolverConfig::default(),
        chrono::Duration::hours(1),
    );
    (build_router(state), pool, dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_module_and_version() {
    let (app, _pool, _dir) = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "frontdesk-sv");
    assert!(body["version"].is_string());
}

// =============================================================================
// Knowledge lookup
// =============================================================================

#[tokio::test]
async fn resolve_returns_seeded_answer_for_known_question() {
    let (app, _pool, _dir) = setup_app().await;

    let request = post_json("/resolve", json!({"question": "What are your business hours?"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["answer"].as_str().unwrap().contains("Tuesday"));
    assert!(body["entryId"].is_string());
    assert!(body.get("escalate").is_none());
}

#[tokio::test]
async fn resolve_signals_escalation_for_unknown_question() {
    let (app, _pool, _dir) = setup_app().await;

    let request = post_json("/resolve", json!({"question": "Do you have parking?"}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["escalate"], true);
}

#[tokio::test]
async fn resolve_rejects_missing_question() {
    let (app, _pool, _dir) = setup_app().await;

    let response = app.oneshot(post_json("/resolve", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn knowledge_list_returns_the_five_seeds() {
    let (app, _pool, _dir) = setup_app().await;

    let response = app.oneshot(get("/knowledge")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|e| e["source"] == "initial"));
}

// =============================================================================
// Escalation round-trip
// =============================================================================

#[tokio::test]
async fn created_request_appears_pending_with_one_hour_deadline() {
    let (app, _pool, _dir) = setup_app().await;

    let request = post_json(
        "/help-requests",
        json!({
            "customerPhone": "+15550001",
            "question": "Do you have parking?",
            "customerName": "Sam"
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let request_id = body["requestId"].as_str().unwrap().to_string();

    let response = app.oneshot(get("/help-requests/pending")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let pending = body.as_array().unwrap();
    assert_eq!(pending.len(), 1);

    let entry = &pending[0];
    assert_eq!(entry["id"], request_id.as_str());
    assert_eq!(entry["status"], "pending");
    assert_eq!(entry["customerPhone"], "+15550001");

    let created_at: DateTime<Utc> = entry["createdAt"].as_str().unwrap().parse().unwrap();
    let timeout_at: DateTime<Utc> = entry["timeoutAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(timeout_at - created_at, chrono::Duration::hours(1));
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let (app, _pool, _dir) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/help-requests", json!({"question": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/help-requests", json!({"customerPhone": "+15550001"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn respond_resolves_request_and_learns_the_answer() {
    let (app, _pool, _dir) = setup_app().await;

    // Unknown question escalates
    let response = app
        .clone()
        .oneshot(post_json("/resolve", json!({"question": "Do you have parking?"})))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["escalate"], true);

    let response = app
        .clone()
        .oneshot(post_json(
            "/help-requests",
            json!({"customerPhone": "+15550001", "question": "Do you have parking?"}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let request_id = body["requestId"].as_str().unwrap().to_string();

    // Supervisor answers
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/help-requests/{}/respond", request_id),
            json!({"answer": "Yes, free parking in the lot"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updatedRequest"]["status"], "resolved");
    assert_eq!(
        body["updatedRequest"]["supervisorAnswer"],
        "Yes, free parking in the lot"
    );
    assert!(body["updatedRequest"]["resolvedAt"].is_string());

    // Pending count back to zero, knowledge base grew by one
    let response = app.clone().oneshot(get("/help-requests/pending")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let response = app.clone().oneshot(get("/knowledge")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 6);
    let learned = entries.iter().find(|e| e["source"] == "learned").unwrap();
    assert_eq!(learned["question"], "Do you have parking?");
    assert_eq!(learned["answer"], "Yes, free parking in the lot");

    // Re-query now hits the learned entry
    let response = app
        .oneshot(post_json("/resolve", json!({"question": "Do you have parking?"})))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["answer"], "Yes, free parking in the lot");
}

#[tokio::test]
async fn respond_to_unknown_id_returns_404() {
    let (app, _pool, _dir) = setup_app().await;

    let response = app
        .oneshot(post_json(
            "/help-requests/no-such-id/respond",
            json!({"answer": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn respond_without_answer_returns_400_and_has_no_side_effects() {
    let (app, pool, _dir) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/help-requests",
            json!({"customerPhone": "+15550001", "question": "Do you have parking?"}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let request_id = body["requestId"].as_str().unwrap().to_string();

    for payload in [json!({}), json!({"answer": "   "})] {
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/help-requests/{}/respond", request_id),
                payload,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // Request untouched, nothing learned
    let request = db::requests::get_request(&pool, &request_id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(db::knowledge::count_entries(&pool).await.unwrap(), 5);
}

#[tokio::test]
async fn respond_twice_returns_409() {
    let (app, _pool, _dir) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/help-requests",
            json!({"customerPhone": "+15550001", "question": "Do you have parking?"}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let request_id = body["requestId"].as_str().unwrap().to_string();
    let uri = format!("/help-requests/{}/respond", request_id);

    let response = app
        .clone()
        .oneshot(post_json(&uri, json!({"answer": "first answer"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(&uri, json!({"answer": "second answer"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// =============================================================================
// Timeout sweep on the pending read
// =============================================================================

#[tokio::test]
async fn pending_read_sweeps_expired_requests_idempotently() {
    let (app, pool, _dir) = setup_app().await;

    // Backdate a request so its deadline has already passed
    let mut expired = HelpRequest::new(
        "+15550002",
        "Is the salon wheelchair accessible?",
        None,
        None,
        chrono::Duration::hours(1),
    );
    expired.created_at = Utc::now() - chrono::Duration::hours(2);
    expired.timeout_at = Utc::now() - chrono::Duration::hours(1);
    db::requests::insert_request(&pool, &expired).await.unwrap();

    let response = app.clone().oneshot(get("/help-requests/pending")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    // Repeated reads keep the terminal state (no flapping back to pending)
    for _ in 0..3 {
        let response = app.clone().oneshot(get("/help-requests/pending")).await.unwrap();
        let body = extract_json(response.into_body()).await;
        assert_eq!(body.as_array().unwrap().len(), 0);

        let request = db::requests::get_request(&pool, &expired.id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Timeout);
    }

    // And responding to it now conflicts
    let response = app
        .oneshot(post_json(
            &format!("/help-requests/{}/respond", expired.id),
            json!({"answer": "too late"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
