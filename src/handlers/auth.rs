use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, Claims};
use crate::database::models::user::{CreateUser, User, UserRole};
use crate::database::service::find_user_by_email;
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::RequestIdentity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

/// POST /api/v1/auth/sign-up - anonymous; creates a regular user
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let input = CreateUser {
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        phone_number: request.phone_number,
        user_role: UserRole::User,
        password: Some(User::digest_password(&request.password)),
    };

    let user = Repository::<User>::new(state.db.clone()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// POST /api/v1/auth/sign-in - anonymous; verifies credentials and issues a
/// bearer token
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let user = find_user_by_email(&state.db, &request.email)
        .await?
        .ok_or(AuthError::AuthorizationFailed)?;

    let stored = user.password.as_deref().ok_or(AuthError::AuthorizationFailed)?;
    if stored != User::digest_password(&request.password) {
        tracing::warn!(email = %request.email, "sign-in with wrong credentials");
        return Err(AuthError::AuthorizationFailed.into());
    }

    let access_token = state
        .tokens
        .issue(user.id.to_string(), user.email, user.user_role)?;

    Ok(Json(SignInResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.tokens.token_ttl().num_seconds(),
    }))
}

/// GET /api/v1/auth/whoami - echoes the claims published by the auth gate
pub async fn whoami(Extension(identity): Extension<RequestIdentity>) -> Json<Claims> {
    Json(identity.claims)
}
