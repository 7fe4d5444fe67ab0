//! OpenAPI documentation
//!
//! Author: hephaex@gmail.com

use crate::auth::TokenResponse;
use crate::error::ApiError;
use crate::handlers::{auth, health, users};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use warden_core::{CreateUserInput, LoginInput, UpdateUserInput, User, UserRole};

/// Registers the bearer token scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Warden API",
        description = "User management with JWT authentication",
        license(name = "Apache-2.0")
    ),
    paths(
        health::health_check,
        auth::login_handler,
        auth::me_handler,
        users::create_user,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
    ),
    components(schemas(
        ApiError,
        TokenResponse,
        User,
        UserRole,
        LoginInput,
        CreateUserInput,
        UpdateUserInput,
        users::MessageResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "auth", description = "Login and current user"),
        (name = "users", description = "User administration")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_user_routes() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/users"));
        assert!(doc.paths.paths.contains_key("/api/users/{id}"));

        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
