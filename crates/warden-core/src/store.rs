//! PostgreSQL user store
//!
//! Provides user persistence using SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};

use crate::config::DatabaseConfig;
use crate::models::{CreateUserInput, User, UserChanges};
use crate::{Result, StoreError, UniqueField};

const USER_COLUMNS: &str = "id, username, password_hash, email, role, created_at, updated_at";

/// Trait for user persistence
///
/// Lookups return `Ok(None)` for a missing user rather than an error.
/// Every operation is a single statement, so dropping the returned future
/// aborts the query without leaving partial writes behind.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user and return it with its assigned id and timestamps
    async fn create(&self, input: &CreateUserInput, password_hash: &str) -> Result<User>;

    /// Apply the supplied changes; with no changes the current record is
    /// returned untouched. Fails with `NotFound` if the user does not exist.
    async fn update(&self, id: i64, changes: &UserChanges) -> Result<User>;

    /// Hard delete; deleting a missing user succeeds
    async fn delete(&self, id: i64) -> Result<()>;

    /// List users ordered by id ascending
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>>;
}

/// PostgreSQL user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = config
            .connect_options()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = row
            .role
            .parse()
            .map_err(|e| StoreError::Database(format!("Corrupt user row {}: {e}", row.id)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_write_error(context: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_username_key") => return StoreError::Conflict(UniqueField::Username),
                Some("users_email_key") => return StoreError::Conflict(UniqueField::Email),
                _ => {}
            }
        }
    }
    StoreError::Database(format!("{context}: {err}"))
}

impl PgUserStore {
    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to get user by {column}: {e}")))?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to get user by id: {e}")))?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_by("email", email).await
    }

    async fn create(&self, input: &CreateUserInput, password_hash: &str) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (username, password_hash, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(password_hash)
        .bind(&input.email)
        .bind(input.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create user", e))?;

        User::try_from(row)
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<User> {
        if changes.is_empty() {
            return self.get_by_id(id).await?.ok_or(StoreError::NotFound);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        if let Some(username) = &changes.username {
            set.push("username = ").push_bind_unseparated(username.clone());
        }
        if let Some(email) = &changes.email {
            set.push("email = ").push_bind_unseparated(email.clone());
        }
        if let Some(hash) = &changes.password_hash {
            set.push("password_hash = ").push_bind_unseparated(hash.clone());
        }
        if let Some(role) = changes.role {
            set.push("role = ").push_bind_unseparated(role.as_str());
        }
        set.push("updated_at = NOW()");

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        let row: Option<UserRow> = builder
            .build_query_as::<UserRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error("Failed to update user", e))?;

        row.map(User::try_from).transpose()?.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to delete user: {e}")))?;

        tracing::debug!(user_id = id, rows = result.rows_affected(), "delete user");
        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to list users: {e}")))?;

        rows.into_iter().map(User::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    async fn test_store() -> PgUserStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let config = DatabaseConfig {
            url: Some(url),
            ..Default::default()
        };
        let store = PgUserStore::connect(&config).await.unwrap();
        store.migrate().await.unwrap();
        sqlx::query("TRUNCATE users RESTART IDENTITY")
            .execute(store.pool())
            .await
            .unwrap();
        store
    }

    fn input(name: &str) -> CreateUserInput {
        CreateUserInput {
            username: name.to_string(),
            password: "unused-here".to_string(),
            email: format!("{name}@example.com"),
            role: UserRole::User,
        }
    }

    #[test]
    fn test_row_conversion_rejects_unknown_role() {
        let now = Utc::now();
        let row = UserRow {
            id: 1,
            username: "a".to_string(),
            password_hash: "h".to_string(),
            email: "a@example.com".to_string(),
            role: "root".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(User::try_from(row), Err(StoreError::Database(_))));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_create_update_delete_round() {
        let store = test_store().await;

        let created = store.create(&input("carol"), "hash").await.unwrap();
        assert_eq!(created.username, "carol");

        let unchanged = store.update(created.id, &UserChanges::default()).await.unwrap();
        assert_eq!(unchanged, created);

        let changes = UserChanges {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        let updated = store.update(created.id, &changes).await.unwrap();
        assert_eq!(updated.role, UserRole::Admin);
        assert!(updated.updated_at >= created.updated_at);

        store.delete(created.id).await.unwrap();
        store.delete(created.id).await.unwrap();
        assert!(store.get_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            store.update(created.id, &changes).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_unique_violation_maps_to_conflict() {
        let store = test_store().await;

        store.create(&input("dave"), "hash").await.unwrap();
        let mut dup = input("dave");
        dup.email = "other@example.com".to_string();

        assert!(matches!(
            store.create(&dup, "hash").await,
            Err(StoreError::Conflict(UniqueField::Username))
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_list_orders_by_id() {
        let store = test_store().await;
        for i in 0..15 {
            store.create(&input(&format!("user{i}")), "hash").await.unwrap();
        }

        let first = store.list(0, 10).await.unwrap();
        let rest = store.list(10, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(rest.len(), 5);
        assert!(first.windows(2).all(|w| w[0].id < w[1].id));
        assert!(first[9].id < rest[0].id);
    }
}
