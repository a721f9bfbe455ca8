use axum::Json;
use serde_json::{json, Value};

/// GET /api/v1/health-check - liveness probe, anonymous
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "Success" }))
}
