//! One-time token repository
//!
//! Storage for email verification, login-link and password-reset tokens.

use crate::db::DynDatabasePool;
use crate::models::{OneTimeToken, TokenPurpose};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait OneTimeTokenRepository: Send + Sync {
    async fn create(&self, token: &OneTimeToken) -> Result<()>;

    /// Most recent token of `purpose` issued to `user_id`
    async fn find(&self, user_id: &str, purpose: TokenPurpose) -> Result<Option<OneTimeToken>>;

    /// Returns `true` if this call removed the token
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Drop every token of `purpose` issued to `user_id`
    async fn delete_for_user(&self, user_id: &str, purpose: TokenPurpose) -> Result<u64>;
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: String,
    user_id: String,
    purpose: String,
    token_hash: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for OneTimeToken {
    type Error = anyhow::Error;

    fn try_from(row: TokenRow) -> Result<Self> {
        Ok(OneTimeToken {
            id: row.id,
            user_id: row.user_id,
            purpose: row.purpose.parse()?,
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

pub struct SqlxOneTimeTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxOneTimeTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn OneTimeTokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl OneTimeTokenRepository for SqlxOneTimeTokenRepository {
    async fn create(&self, token: &OneTimeToken) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO one_time_tokens (id, user_id, purpose, token_hash, created_at, expires_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&token.id)
            .bind(&token.user_id)
            .bind(token.purpose.as_str())
            .bind(&token.token_hash)
            .bind(token.created_at)
            .bind(token.expires_at)
            .execute(conn)
            .await
            .context("Failed to create one-time token")?;
        });
        Ok(())
    }

    async fn find(&self, user_id: &str, purpose: TokenPurpose) -> Result<Option<OneTimeToken>> {
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, TokenRow>(
                "SELECT id, user_id, purpose, token_hash, created_at, expires_at \
                 FROM one_time_tokens WHERE user_id = ? AND purpose = ? \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(user_id)
            .bind(purpose.as_str())
            .fetch_optional(conn)
            .await
            .context("Failed to find one-time token")?
        });
        row.map(OneTimeToken::try_from).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM one_time_tokens WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete one-time token")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn delete_for_user(&self, user_id: &str, purpose: TokenPurpose) -> Result<u64> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM one_time_tokens WHERE user_id = ? AND purpose = ?")
                .bind(user_id)
                .bind(purpose.as_str())
                .execute(conn)
                .await
                .context("Failed to delete one-time tokens")?
                .rows_affected()
        });
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};

    async fn setup() -> (SqlxOneTimeTokenRepository, String) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "a@example.com".to_string(),
                "A".to_string(),
                "h".to_string(),
                UserRole::User,
            ))
            .await
            .unwrap();
        (SqlxOneTimeTokenRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_find_delete() {
        let (repo, user_id) = setup().await;
        let token = OneTimeToken::new(user_id.clone(), TokenPurpose::PasswordReset, "hash".to_string());
        repo.create(&token).await.unwrap();

        let found = repo.find(&user_id, TokenPurpose::PasswordReset).await.unwrap().unwrap();
        assert_eq!(found.id, token.id);
        assert_eq!(found.purpose, TokenPurpose::PasswordReset);
        assert!(repo.find(&user_id, TokenPurpose::Login).await.unwrap().is_none());

        assert!(repo.delete(&token.id).await.unwrap());
        assert!(!repo.delete(&token.id).await.unwrap());
        assert!(repo.find(&user_id, TokenPurpose::PasswordReset).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_user_scoped_by_purpose() {
        let (repo, user_id) = setup().await;
        repo.create(&OneTimeToken::new(user_id.clone(), TokenPurpose::Login, "a".to_string()))
            .await
            .unwrap();
        repo.create(&OneTimeToken::new(user_id.clone(), TokenPurpose::EmailVerification, "b".to_string()))
            .await
            .unwrap();

        assert_eq!(repo.delete_for_user(&user_id, TokenPurpose::Login).await.unwrap(), 1);
        assert!(repo.find(&user_id, TokenPurpose::EmailVerification).await.unwrap().is_some());
    }
}
