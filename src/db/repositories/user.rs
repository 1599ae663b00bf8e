//! User repository

use crate::db::DynDatabasePool;
use crate::models::{ListParams, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;

    /// Insert `user`, storing it as an admin instead when no user exists
    /// yet. The insert itself decides, so two first registrations cannot
    /// both become admins.
    async fn create_promoting_first(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn count(&self) -> Result<i64>;

    /// Users ordered by creation time, newest first, with the total count
    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)>;

    async fn mark_verified(&self, id: &str) -> Result<()>;

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<()>;

    async fn update_role(&self, id: &str, role: UserRole) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            verified: row.verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, verified, created_at, updated_at";

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(value)
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get user by {}", column))?
        });
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let sql = "INSERT INTO users (id, email, name, password_hash, role, verified, created_at, updated_at) \
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
        on_pool!(self.pool, conn => {
            sqlx::query(sql)
                .bind(&user.id)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .bind(user.verified)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(conn)
                .await
                .context("Failed to create user")?;
        });
        Ok(user.clone())
    }

    async fn create_promoting_first(&self, user: &User) -> Result<User> {
        let sql = "INSERT INTO users (id, email, name, password_hash, role, verified, created_at, updated_at) \
                   SELECT ?, ?, ?, ?, CASE WHEN EXISTS (SELECT 1 FROM users) THEN ? ELSE ? END, ?, ?, ?";
        on_pool!(self.pool, conn => {
            sqlx::query(sql)
                .bind(&user.id)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .bind(UserRole::Admin.as_str())
                .bind(user.verified)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(conn)
                .await
                .context("Failed to create user")?;
        });
        self.get_by_id(&user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} missing after insert", user.id))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        self.fetch_one_by("id", id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_by("email", email).await
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(conn)
                .await
                .context("Failed to count users")?
        });
        Ok(count)
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list users")?
        });
        let users = rows.into_iter().map(User::try_from).collect::<Result<Vec<_>>>()?;
        Ok((users, self.count().await?))
    }

    async fn mark_verified(&self, id: &str) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE users SET verified = ?, updated_at = ? WHERE id = ?")
                .bind(true)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to mark user verified")?;
        });
        Ok(())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update password")?;
        });
        Ok(())
    }

    async fn update_role(&self, id: &str, role: UserRole) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
                .bind(role.as_str())
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update role")?;
        });
        Ok(())
    }
}
