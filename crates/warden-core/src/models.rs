//! User domain models
//!
//! This module defines the data structures shared by the store and the API:
//! - User: persisted account record
//! - UserRole: access level (admin, user)
//! - CreateUserInput / UpdateUserInput / LoginInput: validated request inputs
//! - UserChanges: the partial column set handed to the store on update

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

/// User role enum
///
/// - Admin: may manage every account
/// - User: may only read their own profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// Convert role to its stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role '{0}': must be one of admin, user")]
pub struct InvalidRole(pub String);

impl FromStr for UserRole {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

/// User account model
///
/// Maps to the `users` table. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct User {
    /// Store-assigned identifier, never reused
    pub id: i64,

    /// Unique login name
    pub username: String,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Unique email address
    pub email: String,

    pub role: UserRole,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Login credentials
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// User creation request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    pub role: UserRole,
}

/// User update request
///
/// Absent, null and empty-string fields all mean "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserInput {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub role: Option<UserRole>,
}

impl UpdateUserInput {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.email.is_none()
            && self.role.is_none()
    }
}

/// Columns to change on an existing user
///
/// Only `Some` fields are written; `updated_at` is refreshed whenever at
/// least one field is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
    }
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => raw.parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            email: "alice@example.com".to_string(),
            role: UserRole::Admin,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_role_conversion() {
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::User.as_str(), "user");

        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!("user".parse::<UserRole>(), Ok(UserRole::User));
        assert!("ADMIN".parse::<UserRole>().is_err());
        assert!("editor".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn test_create_input_validation() {
        let valid: CreateUserInput = serde_json::from_value(serde_json::json!({
            "username": "bob",
            "password": "longenough",
            "email": "bob@example.com",
            "role": "user"
        }))
        .unwrap();
        assert!(valid.validate().is_ok());

        let short_password = CreateUserInput {
            password: "short".to_string(),
            ..valid.clone()
        };
        assert!(short_password.validate().is_err());

        let bad_email = CreateUserInput {
            email: "not-an-email".to_string(),
            ..valid
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_create_input_rejects_unknown_role() {
        let result = serde_json::from_value::<CreateUserInput>(serde_json::json!({
            "username": "bob",
            "password": "longenough",
            "email": "bob@example.com",
            "role": "superuser"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_input_treats_empty_strings_as_absent() {
        let input: UpdateUserInput = serde_json::from_value(serde_json::json!({
            "username": "",
            "password": "",
            "email": null,
            "role": ""
        }))
        .unwrap();

        assert!(input.is_empty());
        assert!(input.validate().is_ok());

        let input: UpdateUserInput = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(input.is_empty());
    }

    #[test]
    fn test_update_input_validates_present_fields() {
        let input: UpdateUserInput = serde_json::from_value(serde_json::json!({
            "password": "short",
            "role": "admin"
        }))
        .unwrap();

        assert_eq!(input.role, Some(UserRole::Admin));
        assert!(input.validate().is_err());

        let result = serde_json::from_value::<UpdateUserInput>(serde_json::json!({
            "role": "root"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_user_changes_is_empty() {
        assert!(UserChanges::default().is_empty());

        let changes = UserChanges {
            role: Some(UserRole::User),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
