//! Authentication service layer
//!
//! Checks credentials against the user store and issues access tokens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use utoipa::ToSchema;
use warden_core::{LoginInput, PasswordConfig, UserStore};

use super::jwt::{generate_access_token, validate_access_token, Claims, JwtConfig, JwtError};
use super::password::{hash_password_blocking, verify_password_blocking, PasswordError};
use crate::error::AppError;

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Successful login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    jwt_config: JwtConfig,
    password_config: PasswordConfig,
    /// Hash verified against when the username is unknown
    decoy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        store: Arc<dyn UserStore>,
        jwt_config: JwtConfig,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            store,
            jwt_config,
            password_config,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn decoy_hash(&self) -> Result<&str, PasswordError> {
        let hash = self
            .decoy_hash
            .get_or_try_init(|| {
                hash_password_blocking(
                    "warden-decoy-password".to_string(),
                    self.password_config.clone(),
                )
            })
            .await?;
        Ok(hash.as_str())
    }

    /// Login with username and password
    ///
    /// An unknown username and a wrong password produce the same error.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Signed access token
    /// * `Err(AppError::Unauthorized)` - Invalid credentials
    pub async fn login(&self, input: LoginInput) -> Result<String, AppError> {
        let Some(user) = self.store.get_by_username(&input.username).await? else {
            // Same Argon2 work as a wrong password
            let hash = self.decoy_hash().await?.to_string();
            verify_password_blocking(input.password, hash).await?;
            tracing::warn!(username = %input.username, "login failed: unknown user");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let password_valid =
            verify_password_blocking(input.password, user.password_hash.clone()).await?;
        if !password_valid {
            tracing::warn!(
                user_id = user.id,
                username = %user.username,
                "login failed: wrong password"
            );
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = generate_access_token(&self.jwt_config, user.id, &user.username, user.role)?;
        tracing::info!(user_id = user.id, username = %user.username, "user logged in");
        Ok(token)
    }

    /// Validate an access token with the configured secret and issuer
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        validate_access_token(&self.jwt_config, token)
    }
}
