//! Application state management
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Instant;

use warden_core::{AppConfig, UserStore};

use crate::auth::jwt::JwtConfig;
use crate::auth::service::AuthService;
use crate::users::UserService;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// User management
    pub user_service: UserService,
    /// Login and token validation
    pub auth_service: AuthService,
}

impl AppState {
    /// Create new application state over a user store
    pub fn new(config: AppConfig, store: Arc<dyn UserStore>) -> Self {
        let user_service = UserService::new(store.clone(), config.auth.password.clone());
        let auth_service = AuthService::new(
            store,
            JwtConfig::from(&config.auth),
            config.auth.password.clone(),
        );

        Self {
            config,
            start_time: Instant::now(),
            user_service,
            auth_service,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
