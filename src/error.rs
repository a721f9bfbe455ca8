// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::DatabaseError;

/// Boundary translator: every rejected request maps to one of these, and
/// each renders as `{"message": ..., "metadata": ...?}` with its status code.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request (uniqueness/integrity violation on write)
    Conflict(String),

    // 401 Unauthorized
    Authentication(AuthError),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (count/data query execution fault)
    Query(String),

    // Downstream call failed with a 4xx
    Client { message: String, metadata: Option<Value> },

    // Downstream call failed with a 5xx
    Server { message: String, metadata: Option<Value> },

    // 500 Internal Server Error
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Query(_) => StatusCode::CONFLICT,
            ApiError::Client { .. } => StatusCode::BAD_REQUEST,
            ApiError::Server { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::Authentication(AuthError::NoToken) => "No Token",
            ApiError::Authentication(AuthError::TokenExpired) => "Token Expired",
            ApiError::Authentication(AuthError::AuthorizationFailed) => "Authorization Failed",
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Query(msg) => msg,
            ApiError::Client { message, .. } => message,
            ApiError::Server { message, .. } => message,
            ApiError::Internal(msg) => msg,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({ "message": self.message() });

        if let ApiError::Client { metadata: Some(meta), .. } | ApiError::Server { metadata: Some(meta), .. } = self {
            body["metadata"] = meta.clone();
        }

        body
    }
}

// Static constructors
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        ApiError::Query(message.into())
    }

    pub fn client(message: impl Into<String>, metadata: Option<Value>) -> Self {
        ApiError::Client { message: message.into(), metadata }
    }

    pub fn server(message: impl Into<String>, metadata: Option<Value>) -> Self {
        ApiError::Server { message: message.into(), metadata }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Authentication(err)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::Query(msg) => {
                tracing::error!("query fault: {}", msg);
                ApiError::query("Query error, try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("sqlx error: {}", sqlx_err);
                ApiError::internal("An error occurred while processing your request")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
