//! Warden Configuration Management
//!
//! Configuration is read from a TOML file when one exists and then
//! overridden by environment variables, with development defaults for
//! everything else.

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Signing secret used when none is configured. Rejected in production.
pub const DEV_JWT_SECRET: &str = "development-secret-key-change-in-production";

/// Longest accepted access token lifetime (one year)
pub const MAX_JWT_EXPIRATION_MINUTES: u64 = 60 * 24 * 365;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token signing and password hashing
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Load the file at `path` if it exists, then apply environment overrides
    /// and validate the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let base = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        let config = base.with_env_override()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.override_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn override_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = parse_value("SERVER_PORT", port)?;
        }
        if let Some(env) = lookup("SERVER_ENVIRONMENT") {
            self.server.environment = env;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = lookup("DATABASE_HOST") {
            self.database.host = host;
        }
        if let Some(port) = lookup("DATABASE_PORT") {
            self.database.port = parse_value("DATABASE_PORT", port)?;
        }
        if let Some(user) = lookup("DATABASE_USER") {
            self.database.user = user;
        }
        if let Some(password) = lookup("DATABASE_PASSWORD") {
            self.database.password = password;
        }
        if let Some(name) = lookup("DATABASE_DBNAME") {
            self.database.dbname = name;
        }
        if let Some(mode) = lookup("DATABASE_SSLMODE") {
            self.database.sslmode = mode;
        }

        // JWT
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(minutes) = lookup("JWT_EXPIRATION") {
            self.auth.jwt_expiration_minutes = parse_value("JWT_EXPIRATION", minutes)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Reject configurations that cannot run safely
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if self.server.is_production() && self.auth.jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::InvalidValue {
                key: "JWT_SECRET".to_string(),
                value: "<development default>".to_string(),
            });
        }
        if self.auth.jwt_expiration_minutes > MAX_JWT_EXPIRATION_MINUTES {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRATION".to_string(),
                value: self.auth.jwt_expiration_minutes.to_string(),
            });
        }
        self.database.connect_options()?;
        if self.server.max_page_size < 1 {
            return Err(ConfigError::InvalidValue {
                key: "server.max_page_size".to_string(),
                value: self.server.max_page_size.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Deployment environment (development, production, ...)
    pub environment: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,

    /// Upper bound applied to the `limit` query parameter
    pub max_page_size: i64,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "development".to_string(),
            request_timeout_secs: 30,
            cors_origins: vec![],
            max_page_size: 100,
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full PostgreSQL URL; takes precedence over the discrete fields
    pub url: Option<String>,

    pub host: String,

    pub port: u16,

    pub user: String,

    pub password: String,

    pub dbname: String,

    pub sslmode: String,

    /// Connection pool size
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// PostgreSQL connection options
    ///
    /// Built field by field so credentials never need URL escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return url.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DATABASE_URL".to_string(),
                value: "<redacted>".to_string(),
            });
        }

        let ssl_mode =
            PgSslMode::from_str(&self.sslmode).map_err(|_| ConfigError::InvalidValue {
                key: "DATABASE_SSLMODE".to_string(),
                value: self.sslmode.clone(),
            })?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
            .ssl_mode(ssl_mode))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "warden".to_string(),
            password: "warden_dev_password".to_string(),
            dbname: "warden".to_string(),
            sslmode: "disable".to_string(),
            max_connections: 10,
        }
    }
}

/// Token and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,

    /// Token lifetime in minutes
    pub jwt_expiration_minutes: u64,

    /// `iss` claim written to and required on every token
    pub jwt_issuer: String,

    /// Argon2 parameters for new hashes
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration_minutes: 60,
            jwt_issuer: "warden".to_string(),
            password: PasswordConfig::default(),
        }
    }
}

/// Password hashing configuration
///
/// These parameters are tuned for security while maintaining acceptable performance.
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
