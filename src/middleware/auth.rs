use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, Claims, TokenService};
use crate::config;
use crate::error::ApiError;

use super::bearer_token;

/// Per-request identity published by the auth gate and read by downstream
/// handlers. The gate is the only writer; everything after it in the chain
/// reads it from request extensions.
#[derive(Clone, Debug)]
pub struct RequestIdentity {
    pub claims: Claims,
    pub token: String,
}

/// Authentication gate: allowlisted paths pass through untouched; everything
/// else needs a bearer token that decodes against the configured secret.
pub async fn auth_gate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if config::config()
        .security
        .anonymous_paths
        .iter()
        .any(|allowed| allowed == path)
    {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers()).ok_or(AuthError::NoToken)?;

    let claims = tokens.decode(&token).map_err(|e| {
        tracing::warn!(reason = %e, "authentication rejected");
        e
    })?;

    tracing::info!(sub = %claims.sub, "request authenticated");
    request.extensions_mut().insert(RequestIdentity { claims, token });

    Ok(next.run(request).await)
}
