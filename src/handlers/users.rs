use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::pagination::{PaginatedData, PaginationParams};
use crate::database::models::user::{CreateUser, UpdateUser, User};
use crate::database::{Entity, OrderBy, Repository, SelectQuery};
use crate::error::ApiError;
use crate::state::AppState;

fn repository(state: &AppState) -> Repository<User> {
    Repository::new(state.db.clone())
}

/// GET /api/v1/users - paginated listing, ordered by id
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedData<User>>, ApiError> {
    params.validate()?;

    let query = SelectQuery::from_table(User::TABLE)?;
    let order = OrderBy::asc(User::primary_key_column())?;

    let page = repository(&state).paginate(&params, query, Some(order)).await?;
    Ok(Json(page))
}

/// GET /api/v1/users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<User>, ApiError> {
    let user = repository(&state).retrieve(&id).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct BulkIdsQuery {
    /// Comma-separated primary keys
    pub ids: String,
}

impl BulkIdsQuery {
    fn parse(&self) -> Result<Vec<i64>, ApiError> {
        self.ids
            .split(',')
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("invalid id: {}", raw.trim())))
            })
            .collect()
    }
}

/// GET /api/v1/users/bulk?ids=1,2,3 - any missing id fails the whole call
pub async fn bulk_get_users(
    State(state): State<AppState>,
    Query(query): Query<BulkIdsQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let ids = query.parse()?;
    let users = repository(&state).bulk_retrieve(&ids).await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<i64>,
    pub changes: UpdateUser,
}

/// PATCH /api/v1/users - one partial update applied across all listed ids
pub async fn bulk_patch_users(
    State(state): State<AppState>,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<Vec<User>>, ApiError> {
    let repo = repository(&state);

    repo.bulk_update(&request.ids, &request.changes, true).await?;
    let users = repo.bulk_retrieve(&request.ids).await?;

    state.cache.invalidate("/users").await;
    Ok(Json(users))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(mut input): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    input.password = input.password.as_deref().map(User::digest_password);

    let user = repository(&state).create(&input).await?;
    state.cache.invalidate("/users").await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/v1/users/:id - full update; absent fields are written as NULL
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, ApiError> {
    apply_update(&state, id, &input, false).await
}

/// PATCH /api/v1/users/:id - partial update; absent fields keep stored values
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, ApiError> {
    apply_update(&state, id, &input, true).await
}

async fn apply_update(
    state: &AppState,
    id: i64,
    input: &UpdateUser,
    partial: bool,
) -> Result<Json<User>, ApiError> {
    let repo = repository(state);

    // update returns the pre-update snapshot; re-retrieve to respond with
    // the written row
    repo.update(&id, input, partial).await?;
    let user = repo.retrieve(&id).await?;

    state.cache.invalidate("/users").await;
    Ok(Json(user))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    repository(&state).delete(&id).await?;
    state.cache.invalidate("/users").await;

    Ok(StatusCode::NO_CONTENT)
}
