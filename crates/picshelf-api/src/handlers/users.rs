//! User CRUD handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use picshelf_core::{AppError, NewUser, User, UserUpdate};
use serde::Deserialize;

use super::{parse_user_id, user_not_found, MessageResponse};
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[tracing::instrument(skip(state, user), fields(operation = "create_user"))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(user): ValidatedJson<NewUser>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    if !user.is_complete() {
        return Err(AppError::BadRequest("name or email missing!".to_string()).into());
    }

    let id = state.user_repository.create(&user).await?;
    tracing::info!(user_id = id, "User created");

    Ok(Json(MessageResponse::ok("User created successfully!")))
}

#[tracing::instrument(skip(state, update), fields(operation = "update_user"))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ValidatedJson(update): ValidatedJson<UserUpdate>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let id = parse_user_id(&user_id)?;

    if !state.user_repository.update(id, &update).await? {
        return Err(user_not_found().into());
    }

    Ok(Json(MessageResponse::ok("User updated successfully!")))
}

#[tracing::instrument(skip(state), fields(operation = "delete_user"))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let id = parse_user_id(&user_id)?;

    if !state.user_repository.delete(id).await? {
        return Err(user_not_found().into());
    }

    Ok(Json(MessageResponse::ok("User deleted successfully!")))
}

#[tracing::instrument(skip(state), fields(operation = "get_user"))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, HttpAppError> {
    let id = parse_user_id(&user_id)?;

    let user = state
        .user_repository
        .get(id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// All users, or one page when `limit` is given.
#[tracing::instrument(skip(state, query), fields(operation = "list_users"))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, HttpAppError> {
    let Query(query) = query
        .map_err(|_| AppError::BadRequest("invalid limit or offset provided!".to_string()))?;

    let offset = query.offset.unwrap_or(0);
    if offset < 0 || query.limit.is_some_and(|limit| limit <= 0) {
        return Err(AppError::BadRequest("invalid limit or offset provided!".to_string()).into());
    }

    let users = match query.limit {
        Some(limit) => state.user_repository.list(limit, offset).await?,
        None if offset > 0 => state.user_repository.list(-1, offset).await?,
        None => state.user_repository.list_all().await?,
    };

    Ok(Json(users))
}
