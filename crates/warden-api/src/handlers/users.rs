//! User management handlers
//!
//! Admin-only CRUD over user accounts.
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use warden_core::{CreateUserInput, UpdateUserInput, User};

const DEFAULT_OFFSET: i64 = 0;
const DEFAULT_LIMIT: i64 = 10;

/// Pagination query parameters
///
/// Values that are not integers fall back to the defaults.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Number of users to skip (default 0)
    pub offset: Option<String>,
    /// Maximum number of users to return (default 10)
    pub limit: Option<String>,
}

impl ListUsersQuery {
    /// Resolve to `(offset, limit)` with `limit` capped at `max_limit`
    pub fn resolve(&self, max_limit: i64) -> (i64, i64) {
        let parse = |raw: &Option<String>, default: i64| {
            raw.as_deref()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };

        let offset = parse(&self.offset, DEFAULT_OFFSET).max(0);
        let limit = parse(&self.limit, DEFAULT_LIMIT).clamp(0, max_limit.max(0));
        (offset, limit)
    }
}

/// Message-only response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_user_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Username or email taken", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.user_service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users ordered by id", body = [User]),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let (offset, limit) = query.resolve(state.config.server.max_page_size);
    let users = state.user_service.list_users(offset, limit).await?;
    Ok(Json(users))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, description = "Invalid user ID", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    let user = state
        .user_service
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserInput,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 409, description = "Username or email taken", body = crate::error::ApiError),
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateUserInput>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    let user = state.user_service.update_user(id, input).await?;
    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted (or already absent)", body = MessageResponse),
        (status = 400, description = "Invalid user ID", body = crate::error::ApiError),
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_user_id(&id)?;
    state.user_service.delete_user(id).await?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}
