//! JWT token generation and validation
//!
//! Implements JWT-based authentication with HMAC-SHA256 signing.
//! Access tokens carry the user id, username and role and have a
//! configurable lifetime in minutes.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use warden_core::{AuthConfig, UserRole};

/// JWT Claims structure containing user information
///
/// These claims are embedded in the access token and extracted during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// User's login name
    pub username: String,
    /// User's role (admin, user)
    pub role: UserRole,
}

impl Claims {
    /// Numeric user id carried in `sub`
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::InvalidToken)
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token lifetime of {0} minutes is out of range")]
    LifetimeOutOfRange(u64),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
///
/// Contains settings for token generation and validation
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Access token lifetime in minutes
    pub expiration_minutes: u64,
    /// Token issuer identifier
    pub issuer: String,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration_minutes: config.jwt_expiration_minutes,
            issuer: config.jwt_issuer.clone(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Generate a JWT access token for an authenticated user
///
/// # Arguments
///
/// * `config` - JWT configuration containing secret and expiration settings
/// * `user_id` - Store-assigned user id
/// * `username` - User's login name
/// * `role` - User's role
///
/// # Example
///
/// ```no_run
/// use warden_api::auth::jwt::{generate_access_token, JwtConfig};
/// use warden_core::UserRole;
///
/// let config = JwtConfig::default();
/// let token = generate_access_token(&config, 42, "alice", UserRole::Admin)
///     .expect("Failed to generate token");
/// ```
pub fn generate_access_token(
    config: &JwtConfig,
    user_id: i64,
    username: &str,
    role: UserRole,
) -> Result<String, JwtError> {
    let now = now_secs()?;
    let exp = config
        .expiration_minutes
        .checked_mul(60)
        .and_then(|secs| now.checked_add(secs))
        .ok_or(JwtError::LifetimeOutOfRange(config.expiration_minutes))?;

    let claims = Claims {
        iss: config.issuer.clone(),
        sub: user_id.to_string(),
        iat: now,
        exp,
        username: username.to_string(),
        role,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a JWT access token and extract claims
///
/// Signature, issuer and expiry are checked with no leeway; a token whose
/// `exp` is not strictly in the future is expired.
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    if token_data.claims.exp <= now_secs()? {
        return Err(JwtError::ExpiredToken);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(config: &JwtConfig, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_generate_and_validate_token() {
        let config = JwtConfig::default();

        let token = generate_access_token(&config, 42, "alice", UserRole::Admin)
            .expect("Failed to generate token");

        let claims = validate_access_token(&config, &token).expect("Failed to validate token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.iss, "warden");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::default();
        let result = validate_access_token(&config, "invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));

        let result = validate_access_token(&config, "");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig {
            secret: "secret1".to_string(),
            ..Default::default()
        };
        let config2 = JwtConfig {
            secret: "secret2".to_string(),
            ..Default::default()
        };

        let token = generate_access_token(&config1, 1, "bob", UserRole::User).unwrap();

        let result = validate_access_token(&config2, &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_issuer() {
        let config = JwtConfig::default();
        let other = JwtConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        };

        let token = generate_access_token(&other, 1, "bob", UserRole::User).unwrap();
        assert!(matches!(
            validate_access_token(&config, &token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_zero_lifetime_token_is_expired() {
        let config = JwtConfig {
            expiration_minutes: 0,
            ..Default::default()
        };

        let token = generate_access_token(&config, 1, "bob", UserRole::User).unwrap();
        assert!(matches!(
            validate_access_token(&config, &token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let config = JwtConfig {
            expiration_minutes: u64::MAX / 30,
            ..Default::default()
        };

        assert!(matches!(
            generate_access_token(&config, 1, "bob", UserRole::User),
            Err(JwtError::LifetimeOutOfRange(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = JwtConfig::default();
        let now = now_secs().unwrap();

        let claims = Claims {
            iss: config.issuer.clone(),
            sub: "7".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            username: "bob".to_string(),
            role: UserRole::User,
        };

        let result = validate_access_token(&config, &sign(&config, &claims));
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_unknown_role_claim_is_invalid() {
        let config = JwtConfig::default();
        let now = now_secs().unwrap();

        let claims = serde_json::json!({
            "iss": config.issuer,
            "sub": "7",
            "iat": now,
            "exp": now + 600,
            "username": "bob",
            "role": "root",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            validate_access_token(&config, &token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_non_numeric_subject() {
        let claims = Claims {
            iss: "warden".to_string(),
            sub: "not-a-number".to_string(),
            iat: 0,
            exp: 0,
            username: "x".to_string(),
            role: UserRole::User,
        };
        assert!(matches!(claims.user_id(), Err(JwtError::InvalidToken)));
    }
}
