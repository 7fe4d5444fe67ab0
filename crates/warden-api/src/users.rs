//! User management service
//!
//! Enforces username/email uniqueness and existence rules on top of a
//! [`UserStore`], and hashes passwords before they reach the store.

use std::sync::Arc;

use warden_core::{CreateUserInput, PasswordConfig, UpdateUserInput, User, UserChanges, UserStore};

use crate::auth::password::hash_password_blocking;
use crate::error::AppError;

const USERNAME_TAKEN: &str = "username already exists";
const EMAIL_TAKEN: &str = "email already exists";

/// User management service
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    password_config: PasswordConfig,
}

impl UserService {
    /// Create a new user service
    pub fn new(store: Arc<dyn UserStore>, password_config: PasswordConfig) -> Self {
        Self {
            store,
            password_config,
        }
    }

    /// Create a new user
    ///
    /// # Returns
    ///
    /// * `Ok(User)` - The stored user
    /// * `Err(AppError::Conflict)` - Username or email already taken
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, AppError> {
        if self.store.get_by_username(&input.username).await?.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if self.store.get_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash =
            hash_password_blocking(input.password.clone(), self.password_config.clone()).await?;

        let user = self.store.create(&input, &password_hash).await?;
        tracing::info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// Look up a user by id
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Apply a partial update
    ///
    /// Every supplied field is written and refreshes `updated_at`. Username
    /// and email are only re-checked for uniqueness when they differ from
    /// the stored values.
    pub async fn update_user(&self, id: i64, input: UpdateUserInput) -> Result<User, AppError> {
        let current = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut changes = UserChanges {
            role: input.role,
            ..Default::default()
        };

        if let Some(username) = input.username {
            if username != current.username
                && self.store.get_by_username(&username).await?.is_some()
            {
                return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
            }
            changes.username = Some(username);
        }

        if let Some(email) = input.email {
            if email != current.email && self.store.get_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            }
            changes.email = Some(email);
        }

        if let Some(password) = input.password {
            changes.password_hash =
                Some(hash_password_blocking(password, self.password_config.clone()).await?);
        }

        let user = self.store.update(id, &changes).await?;
        if !changes.is_empty() {
            tracing::info!(user_id = id, "user updated");
        }
        Ok(user)
    }

    /// Delete a user; missing users are not an error
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        self.store.delete(id).await?;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }

    /// List users ordered by id
    pub async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, AppError> {
        Ok(self.store.list(offset, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use warden_core::memory::MemoryUserStore;
    use warden_core::UserRole;

    fn light_password_config() -> PasswordConfig {
        PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()), light_password_config())
    }

    fn input(name: &str) -> CreateUserInput {
        CreateUserInput {
            username: name.to_string(),
            password: "password123".to_string(),
            email: format!("{name}@example.com"),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_create_user_stores_verifiable_hash() {
        let service = service();
        let user = service.create_user(input("alice")).await.unwrap();

        assert_eq!(user.username, "alice");
        assert_ne!(user.password_hash, "password123");
        assert!(verify_password("password123", &user.password_hash).unwrap());

        let fetched = service.get_user_by_id(user.id).await.unwrap();
        assert_eq!(fetched, Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let service = service();
        service.create_user(input("alice")).await.unwrap();

        let mut dup = input("alice");
        dup.email = "other@example.com".to_string();

        match service.create_user(dup).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, USERNAME_TAKEN),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let service = service();
        service.create_user(input("alice")).await.unwrap();

        let mut dup = input("bob");
        dup.email = "alice@example.com".to_string();

        match service.create_user(dup).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, EMAIL_TAKEN),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_update_leaves_record_untouched() {
        let service = service();
        let user = service.create_user(input("alice")).await.unwrap();

        let updated = service
            .update_user(user.id, UpdateUserInput::default())
            .await
            .unwrap();

        assert_eq!(updated, user);
        assert_eq!(updated.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_update_to_taken_email_conflicts_without_changes() {
        let service = service();
        let alice = service.create_user(input("alice")).await.unwrap();
        service.create_user(input("bob")).await.unwrap();

        let input = UpdateUserInput {
            email: Some("bob@example.com".to_string()),
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(matches!(
            service.update_user(alice.id, input).await,
            Err(AppError::Conflict(_))
        ));

        let after = service.get_user_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(after, alice);
    }

    #[tokio::test]
    async fn test_update_same_username_is_not_conflict() {
        let service = service();
        let alice = service.create_user(input("alice")).await.unwrap();

        let input = UpdateUserInput {
            username: Some("alice".to_string()),
            password: Some("newpassword".to_string()),
            ..Default::default()
        };
        let updated = service.update_user(alice.id, input).await.unwrap();

        assert_eq!(updated.username, "alice");
        assert!(verify_password("newpassword", &updated.password_hash).unwrap());
        assert!(!verify_password("password123", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_resending_current_values_refreshes_updated_at() {
        let service = service();
        let alice = service.create_user(input("alice")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let input = UpdateUserInput {
            username: Some("alice".to_string()),
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        let updated = service.update_user(alice.id, input).await.unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "alice@example.com");
        assert!(updated.updated_at > alice.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let service = service();
        assert!(matches!(
            service.update_user(42, UpdateUserInput::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_user_succeeds() {
        let service = service();
        service.delete_user(999).await.unwrap();
        assert!(service.get_user_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_users_pagination() {
        let service = service();
        for i in 0..15 {
            service.create_user(input(&format!("user{i}"))).await.unwrap();
        }

        let first = service.list_users(0, 10).await.unwrap();
        let rest = service.list_users(10, 10).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(rest.len(), 5);
        assert!(first.windows(2).all(|w| w[0].id < w[1].id));
        assert!(first.last().unwrap().id < rest[0].id);
    }
}
