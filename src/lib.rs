pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Assembles the request pipeline. Layer order matters: the auth gate runs
/// first, then the response cache, then the handlers.
pub fn app(state: AppState) -> Router {
    let auth_layer = axum::middleware::from_fn_with_state(state.tokens.clone(), middleware::auth_gate);
    let cache_layer = axum::middleware::from_fn_with_state(state.cache.clone(), middleware::response_cache);

    Router::new()
        .route("/api/v1/health-check", get(handlers::health::health_check))
        .merge(auth_routes())
        .merge(user_routes())
        // Innermost layer is applied first in code, so the cache sits inside
        // the gate
        .layer(cache_layer)
        .layer(auth_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/api/v1/auth/sign-up", post(auth::sign_up))
        .route("/api/v1/auth/sign-in", post(auth::sign_in))
        .route("/api/v1/auth/whoami", get(auth::whoami))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route(
            "/api/v1/users",
            get(users::list_users)
                .post(users::create_user)
                .patch(users::bulk_patch_users),
        )
        .route("/api/v1/users/bulk", get(users::bulk_get_users))
        .route(
            "/api/v1/users/:id",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
}
