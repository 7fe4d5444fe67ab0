/// Authentication middleware for protecting routes
///
/// Extracts and validates JWT tokens from the Authorization header.
/// On success, adds authenticated user information to request extensions.
use super::jwt::{Claims, JwtError};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use warden_core::UserRole;

/// Authenticated user information extracted from JWT
///
/// This is added to request extensions by the auth middleware
/// and can be extracted in handlers using `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User's store id
    pub user_id: i64,
    /// User's login name
    pub username: String,
    /// User's role
    pub role: UserRole,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            username: claims.username,
            role: claims.role,
        })
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuthHeader => {
                (StatusCode::UNAUTHORIZED, "Authorization header is required")
            }
            AuthError::InvalidAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "Authorization header format must be Bearer {token}",
            ),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "Insufficient permissions")
            }
        };

        let code = if status == StatusCode::FORBIDDEN {
            "FORBIDDEN"
        } else {
            "UNAUTHORIZED"
        };

        ApiError::new(status, code, message).into_response()
    }
}

/// Extract the token from `Authorization: Bearer <token>`
///
/// The scheme must be exactly `Bearer` followed by one space and a
/// non-empty token containing no further spaces.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() && !token.contains(' ') => Ok(token),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Authentication middleware that requires a valid JWT token
///
/// This middleware:
/// 1. Extracts the Authorization header
/// 2. Validates the Bearer token format
/// 3. Validates the JWT signature, issuer and expiration
/// 4. Adds AuthenticatedUser to request extensions
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use warden_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
///     .with_state(state);
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;

    let user = state
        .auth_service
        .validate_token(token)
        .and_then(AuthenticatedUser::try_from)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            AuthError::InvalidToken(e)
        })?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware for requiring any of multiple roles
///
/// Must run after [`auth_middleware`]. Membership is exact: an admin is
/// only admitted when `Admin` is listed.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::post, middleware};
/// use warden_api::auth::middleware::{auth_middleware, require_any_role};
/// use warden_core::UserRole;
///
/// let app = Router::new()
///     .route("/users", post(create_user))
///     .route_layer(middleware::from_fn(require_any_role(&[UserRole::Admin])))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub fn require_any_role(
    required_roles: &'static [UserRole],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = request
                .extensions()
                .get::<AuthenticatedUser>()
                .ok_or(AuthError::MissingAuthHeader)?;

            if !required_roles.contains(&user.role) {
                tracing::warn!(
                    user_id = user.user_id,
                    role = %user.role,
                    path = %request.uri().path(),
                    "access denied"
                );
                return Err(AuthError::InsufficientPermissions);
            }

            Ok(next.run(request).await)
        })
    }
}
