//! End-to-end pipeline tests against the real router wiring: the auth gate
//! always runs before the response cache, which runs before the handler.

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use keel_api::auth::TokenService;
use keel_api::AppState;

fn app() -> axum::Router {
    let state = AppState::from_config().expect("state from default config");
    keel_api::app(state)
}

fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_check_is_anonymous() -> Result<()> {
    let response = app().oneshot(get_request("/api/v1/health-check", None)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?, serde_json::json!({ "status": "Success" }));
    Ok(())
}

#[tokio::test]
async fn protected_route_requires_a_token() -> Result<()> {
    let response = app().oneshot(get_request("/api/v1/users", None)).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await?["message"], "No Token");
    Ok(())
}

#[tokio::test]
async fn whoami_flows_through_gate_and_cache() -> Result<()> {
    let app = app();
    let token = TokenService::from_config()
        .issue("9", "pat@example.com", "manager")
        .expect("issue");

    let first = app
        .clone()
        .oneshot(get_request("/api/v1/auth/whoami", Some(&token)))
        .await?;
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = body_json(first).await?;
    assert_eq!(first_body["email"], "pat@example.com");
    assert_eq!(first_body["role"], "manager");

    // Second call is a cache hit and replays the identical body
    let second = app
        .clone()
        .oneshot(get_request("/api/v1/auth/whoami", Some(&token)))
        .await?;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await?, first_body);
    Ok(())
}
