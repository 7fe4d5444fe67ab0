//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::{auth_middleware, require_any_role};
use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use warden_core::UserRole;

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
const ANY_ROLE: &[UserRole] = &[UserRole::Admin, UserRole::User];

/// Create `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/auth/login", post(auth::login_handler));

    // Any authenticated user
    let user_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route_layer(middleware::from_fn(require_any_role(ANY_ROLE)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Administrators only
    let admin_routes = Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn(require_any_role(ADMIN_ONLY)))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
}
