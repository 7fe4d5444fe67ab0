//! Warden API - REST server
//!
//! Provides HTTP endpoints for login and user administration.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use warden_core::config::ServerConfig;

use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the CORS layer from the configured origins
///
/// With no origins configured, development allows any origin and other
/// environments allow none.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() && !config.is_production() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the application router with tracing, CORS and timeout layers
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let timeout = Duration::from_secs(server.request_timeout_secs);
    let cors = cors_layer(server);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/healthz", get(handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Application state over an empty in-memory store
///
/// Uses cheap Argon2 parameters so tests stay fast.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> Arc<AppState> {
    let mut config = warden_core::AppConfig::default();
    config.auth.password = warden_core::PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: Some(32),
    };

    let store = Arc::new(warden_core::memory::MemoryUserStore::new());
    Arc::new(AppState::new(config, store))
}

/// Router over a fresh in-memory store
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(create_test_state())
}
