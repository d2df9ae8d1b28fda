use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tokio::sync::watch;

use herald_events::domain::types::TAIL_BLOCK_TIMEOUT;
use herald_events::infra::stream::connect_pool;
use herald_events::router::build_router;
use herald_events::state::AppState;
use herald_testing::tenant::MockTenant;

use crate::helpers::T1;

/// Router over a disconnected database and an unreachable Redis.
///
/// Only paths that are rejected before any store access can succeed against it.
fn server() -> (TestServer, watch::Sender<bool>) {
    let redis = connect_pool("redis://127.0.0.1:1", TAIL_BLOCK_TIMEOUT).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(DatabaseConnection::Disconnected, redis, shutdown_rx);
    (TestServer::new(build_router(state)).unwrap(), shutdown_tx)
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_report_liveness() {
    let (server, _shutdown) = server();

    let response = server.get("/healthz").await;

    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn should_report_unready_when_backends_are_down() {
    let (server, _shutdown) = server();

    let response = server.get("/readyz").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_path() {
    let (server, _shutdown) = server();

    let response = server.get("/nope").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn should_assign_request_id() {
    let (server, _shutdown) = server();

    let response = server.get("/healthz").await;

    assert!(response.headers().contains_key("x-request-id"));
}

// ── Tenant identity ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_create_without_tenant() {
    let (server, _shutdown) = server();

    let response = server
        .post("/events")
        .json(&json!({ "payload": { "message": "hi" } }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "BAD_REQUEST");
}

#[tokio::test]
async fn should_reject_list_without_tenant() {
    let (server, _shutdown) = server();

    let response = server.get("/events").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_reject_subscription_without_tenant() {
    let (server, _shutdown) = server();

    let response = server.get("/sse").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "BAD_REQUEST");
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_out_of_range_limit() {
    let (server, _shutdown) = server();
    let tenant = MockTenant::new(T1);

    for limit in ["0", "201", "abc"] {
        let response = server
            .get("/events")
            .add_header(MockTenant::header_name(), tenant.header_value())
            .add_query_param("limit", limit)
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["kind"], "INVALID_LIMIT");
    }
}

#[tokio::test]
async fn should_reject_non_object_payload() {
    let (server, _shutdown) = server();
    let tenant = MockTenant::new(T1);

    let response = server
        .post("/events")
        .add_header(MockTenant::header_name(), tenant.header_value())
        .json(&json!({ "payload": [1, 2, 3] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn should_reject_event_type_with_line_break() {
    let (server, _shutdown) = server();
    let tenant = MockTenant::new(T1);
    let (name, value) = tenant.query();

    let response = server
        .post("/events")
        .add_query_param(name, value)
        .json(&json!({ "payload": {}, "eventType": "a\r\nb" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "INVALID_EVENT_TYPE");
}

#[tokio::test]
async fn should_fail_with_internal_error_when_store_is_unavailable() {
    let (server, _shutdown) = server();
    let tenant = MockTenant::new(T1);

    let response = server
        .get("/events")
        .add_header(MockTenant::header_name(), tenant.header_value())
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["kind"], "INTERNAL");
}
