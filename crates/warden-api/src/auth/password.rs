/// Password hashing and verification using Argon2id
///
/// Hashes are PHC strings carrying algorithm, parameters and a random
/// 16-byte salt, so verification needs nothing besides the stored string.
/// Cost parameters come from `PasswordConfig` (default 64 MB, 3 iterations,
/// 4 lanes, 32-byte output).
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;
use warden_core::PasswordConfig;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Create Argon2 parameters from configuration
fn argon2_params(config: &PasswordConfig) -> Result<Params, PasswordError> {
    Params::new(
        config.memory_cost,
        config.time_cost,
        config.parallelism,
        config.output_len,
    )
    .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Hash a plaintext password using Argon2id
///
/// # Returns
///
/// * `Ok(String)` - PHC string format hash (includes algorithm, parameters, salt, and hash)
/// * `Err(PasswordError)` - If the parameters are invalid or hashing fails
///
/// # Example
///
/// ```no_run
/// use warden_api::auth::password::hash_password;
/// use warden_core::PasswordConfig;
///
/// let hash = hash_password("SecureP@ssw0rd!", &PasswordConfig::default()).unwrap();
/// // $argon2id$v=19$m=65536,t=3,p=4$...
/// ```
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = argon2_params(config)?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// # Returns
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - If the stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    // Parameters are read from the PHC string
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Run [`hash_password`] on the blocking thread pool
pub async fn hash_password_blocking(
    password: String,
    config: PasswordConfig,
) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
}

/// Run [`verify_password`] on the blocking thread pool
pub async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerificationFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "SecureP@ssw0rd!";
        let hash = hash_password(password, &light_config()).expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("WrongPassword", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        // Random salt per hash
        let password = "SamePassword123!";

        let hash1 = hash_password(password, &light_config()).unwrap();
        let hash2 = hash_password(password, &light_config()).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));

        let result = verify_password("password", "");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_custom_config() {
        let config = PasswordConfig {
            memory_cost: 2048,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };

        let password = "TestPassword123!";
        let hash = hash_password(password, &config).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(hash.contains("m=2048"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));
    }

    #[test]
    fn test_invalid_params_fail_hashing() {
        let config = PasswordConfig {
            time_cost: 0,
            ..light_config()
        };
        assert!(matches!(
            hash_password("whatever1", &config),
            Err(PasswordError::HashingFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hash = hash_password_blocking("Passw0rd!".to_string(), light_config())
            .await
            .unwrap();
        assert!(verify_password_blocking("Passw0rd!".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("nope".to_string(), hash)
            .await
            .unwrap());
    }
}
