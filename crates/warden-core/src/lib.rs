//! Warden Core - Domain models, configuration and user persistence
//!
//! This crate defines the core abstractions used throughout Warden:
//! - User models and validated request inputs
//! - Store error types
//! - The `UserStore` trait and its PostgreSQL implementation
//! - Configuration management

pub mod config;
pub mod models;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, PasswordConfig};
pub use models::{CreateUserInput, LoginInput, UpdateUserInput, User, UserChanges, UserRole};
pub use store::{PgUserStore, UserStore};

use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Column guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => f.write_str("username"),
            UniqueField::Email => f.write_str("email"),
        }
    }
}

/// Errors raised by user stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(UniqueField),

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
