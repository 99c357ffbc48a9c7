//! Dispatch endpoint and admin API through the full router stack.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use route_dispatch::config::DispatchConfig;
use route_dispatch::http::server::AppState;
use route_dispatch::HttpServer;

mod common;

const TOKEN: &str = "test-admin-token";

fn router_with(config: DispatchConfig) -> Router {
    let (engine, _) = common::engine();
    let state = AppState::new(Arc::new(engine), Arc::new(ArcSwap::from_pointee(config)));
    HttpServer::new(state).router()
}

fn router() -> Router {
    let mut config = DispatchConfig::default();
    config.admin.api_key = TOKEN.to_string();
    router_with(config)
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn admin_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_dispatch_reports_cache_outcome() {
    let app = router();

    let first = app
        .clone()
        .oneshot(request(Method::GET, "/_dispatch/users@index"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-dispatch-cache"], "miss");
    assert!(first.headers().contains_key("x-request-id"));
    let body = json_body(first).await;
    assert_eq!(body["handler"], "users");
    assert_eq!(body["method"], "index");

    let second = app
        .oneshot(request(Method::GET, "/_dispatch/users@index"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-dispatch-cache"], "hit");
}

#[tokio::test]
async fn test_incoming_request_id_is_propagated() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/_dispatch/users@show")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_security_violation_hides_details_by_default() {
    let response = router()
        .oneshot(request(Method::GET, "/_dispatch/users@destroy"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "security_violation");
    assert!(body.get("details").is_none());
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_security_violation_details_when_exposed() {
    let mut config = DispatchConfig::default();
    config.listener.expose_error_details = true;
    let response = router_with(config)
        .oneshot(request(Method::GET, "/_dispatch/users@destroy"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["details"]["rule"], "http_verb_semantics");
    assert_eq!(body["details"]["severity"], "medium");
    assert_eq!(body["details"]["handler"], common::USERS);
}

#[tokio::test]
async fn test_destructive_method_with_mutating_verb() {
    let response = router()
        .oneshot(request(Method::DELETE, "/_dispatch/users@destroy"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["method"], "destroy");
}

#[tokio::test]
async fn test_not_found_statuses() {
    let app = router();

    let missing_handler = app
        .clone()
        .oneshot(request(Method::GET, "/_dispatch/missing@index"))
        .await
        .unwrap();
    assert_eq!(missing_handler.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing_handler).await["error"], "handler_not_found");

    let missing_method = app
        .oneshot(request(Method::GET, "/_dispatch/users@nothing"))
        .await
        .unwrap();
    assert_eq!(missing_method.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing_method).await["error"], "security_violation");
}

#[tokio::test]
async fn test_invalid_pattern_is_bad_request() {
    let response = router()
        .oneshot(request(Method::GET, "/_dispatch/users"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_pattern");
}

#[tokio::test]
async fn test_unimplemented_entry_point() {
    let response = router()
        .oneshot(request(Method::GET, "/_dispatch/users@export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json_body(response).await["error"], "not_implemented");
}

#[tokio::test]
async fn test_instantiation_failure_is_server_error() {
    let response = router()
        .oneshot(request(Method::GET, "/_dispatch/reports@index"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "instantiation_failed");
}

#[tokio::test]
async fn test_admin_requires_token() {
    let app = router();

    let anonymous = app
        .clone()
        .oneshot(request(Method::GET, "/admin/stats"))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .oneshot(
            Request::builder()
                .uri("/admin/stats")
                .header(header::AUTHORIZATION, "Bearer nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_stats_and_cache_clear() {
    let app = router();

    app.clone()
        .oneshot(request(Method::GET, "/_dispatch/users@index"))
        .await
        .unwrap();

    let stats = app
        .clone()
        .oneshot(admin_request(Method::GET, "/admin/stats"))
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
    let body = json_body(stats).await;
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["successes"], 1);
    assert_eq!(body["size"], 1);

    let cleared = app
        .clone()
        .oneshot(admin_request(Method::POST, "/admin/cache/clear"))
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::OK);
    assert_eq!(json_body(cleared).await["cleared"], true);

    let after = app
        .clone()
        .oneshot(request(Method::GET, "/_dispatch/users@index"))
        .await
        .unwrap();
    assert_eq!(after.headers()["x-dispatch-cache"], "miss");

    let status = app
        .oneshot(admin_request(Method::GET, "/admin/status"))
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(json_body(status).await["status"], "operational");
}

#[tokio::test]
async fn test_admin_routes_absent_when_disabled() {
    let mut config = DispatchConfig::default();
    config.admin.enabled = false;
    let response = router_with(config)
        .oneshot(admin_request(Method::GET, "/admin/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
