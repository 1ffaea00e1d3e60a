//! Tests for the engine's HTTP surface: `GET /ping` and `GET /`.
//!
//! Requires Docker to be running for testcontainers.

use axum_test::TestServer;
use integration_tests::setup::TestContext;

#[tokio::test]
async fn ping_returns_pong() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(api::router(ctx.app_state())).expect("failed to create test server");

    let response = server.get("/ping").await;
    response.assert_status_ok();
    response.assert_text("pong");
}

#[tokio::test]
async fn root_returns_engine_name() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(api::router(ctx.app_state())).expect("failed to create test server");

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("ingestion-engine");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(api::router(ctx.app_state())).expect("failed to create test server");

    let response = server.get("/nonexistent").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn decision_base_is_a_noop_200() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(api::router(ctx.app_state())).expect("failed to create test server");

    let response = server.post("/decision_base").await;
    response.assert_status_ok();
}
