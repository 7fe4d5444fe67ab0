//! Authentication API handlers
//!
//! Provides HTTP endpoints for login and the caller's own profile.
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthenticatedUser, TokenResponse};
use crate::error::{AppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;
use warden_core::{LoginInput, User};

/// Login with username and password
///
/// # Responses
///
/// * `200 OK` - Authentication successful, returns a bearer token
/// * `400 Bad Request` - Malformed body or missing fields
/// * `401 Unauthorized` - Invalid credentials
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<LoginInput>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.auth_service.login(input).await?;
    Ok(Json(TokenResponse { token }))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
        (status = 404, description = "User no longer exists", body = crate::error::ApiError),
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<User>, AppError> {
    let profile = state
        .user_service
        .get_user_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}
