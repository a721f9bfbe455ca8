//! In-process tests for the authentication gate: allowlist bypass, the three
//! rejection reasons, and identity propagation into request extensions.

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Extension, Json, Router,
};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use tower::ServiceExt;

use keel_api::auth::{Claims, TokenService};
use keel_api::middleware::{auth_gate, RequestIdentity};

fn tokens() -> TokenService {
    TokenService::new("gate-test-secret", Algorithm::HS256, 60)
}

async fn identity_echo(Extension(identity): Extension<RequestIdentity>) -> Json<Value> {
    Json(json!({
        "email": identity.claims.email,
        "token": identity.token,
    }))
}

fn router(tokens: TokenService) -> Router {
    Router::new()
        .route("/api/v1/health-check", get(|| async { "ok" }))
        .route("/api/v1/users", get(identity_echo))
        .layer(from_fn_with_state(tokens, auth_gate))
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

#[tokio::test]
async fn anonymous_path_skips_token_handling() -> Result<()> {
    let response = router(tokens())
        .oneshot(get_request("/api/v1/health-check", None))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn missing_token_is_rejected_with_no_token() -> Result<()> {
    let response = router(tokens()).oneshot(get_request("/api/v1/users", None)).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await?, json!({ "message": "No Token" }));
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected_with_token_expired() -> Result<()> {
    let tokens = tokens();
    let expired = Claims::new("1", "old@example.com", "user", Duration::minutes(-120));
    let token = tokens.encode(&expired).expect("encode");

    let response = router(tokens)
        .oneshot(get_request("/api/v1/users", Some(&token)))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await?, json!({ "message": "Token Expired" }));
    Ok(())
}

#[tokio::test]
async fn tampered_token_is_rejected_with_authorization_failed() -> Result<()> {
    let foreign = TokenService::new("some-other-secret", Algorithm::HS256, 60)
        .issue("1", "mallory@example.com", "admin")
        .expect("issue");

    let response = router(tokens())
        .oneshot(get_request("/api/v1/users", Some(&foreign)))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await?, json!({ "message": "Authorization Failed" }));
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected_with_authorization_failed() -> Result<()> {
    let response = router(tokens())
        .oneshot(get_request("/api/v1/users", Some("not-even-a-token")))
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await?, json!({ "message": "Authorization Failed" }));
    Ok(())
}

#[tokio::test]
async fn valid_token_publishes_identity_to_handlers() -> Result<()> {
    let tokens = tokens();
    let token = tokens.issue("7", "kim@example.com", "admin").expect("issue");

    let response = router(tokens)
        .oneshot(get_request("/api/v1/users", Some(&token)))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["email"], "kim@example.com");
    assert_eq!(body["token"], Value::String(token));
    Ok(())
}
