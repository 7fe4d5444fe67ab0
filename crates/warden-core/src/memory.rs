//! In-memory user store
//!
//! Mirrors the PostgreSQL store semantics, including uniqueness conflicts,
//! so services and routers can be exercised without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::models::{CreateUserInput, User, UserChanges};
use crate::store::UserStore;
use crate::{Result, StoreError, UniqueField};

#[derive(Default)]
struct Inner {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

impl Inner {
    fn check_unique(
        &self,
        id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<()> {
        for user in self.users.values().filter(|u| Some(u.id) != id) {
            if username == Some(user.username.as_str()) {
                return Err(StoreError::Conflict(UniqueField::Username));
            }
            if email == Some(user.email.as_str()) {
                return Err(StoreError::Conflict(UniqueField::Email));
            }
        }
        Ok(())
    }
}

/// Volatile user store backed by a `BTreeMap`
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, input: &CreateUserInput, password_hash: &str) -> Result<User> {
        let mut inner = self.inner.write().await;
        inner.check_unique(None, Some(&input.username), Some(&input.email))?;

        inner.last_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.last_id,
            username: input.username.clone(),
            password_hash: password_hash.to_string(),
            email: input.email.clone(),
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        inner.check_unique(Some(id), changes.username.as_deref(), changes.email.as_deref())?;

        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if changes.is_empty() {
            return Ok(user.clone());
        }
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.inner.write().await.users.remove(&id);
        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let inner = self.inner.read().await;
        Ok(inner.users.values().skip(offset).take(limit).cloned().collect())
    }
}
