//! Access and refresh token handling
//!
//! Access tokens are short-lived HS256 JWTs carrying the user id and role.
//! Refresh tokens are long-lived JWTs whose audience is the user id; the one
//! live refresh token of each user is kept in the key-value store under
//! [`refresh_key`], and a presented token verifies only if it matches it.

use anyhow::Context;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{refresh_key, CacheLayer};
use crate::config::AuthConfig;
use crate::db::repositories::UserRepository;
use crate::models::UserRole;
use crate::services::error::ServiceError;

/// Claims of an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: String,
    pub user_role: UserRole,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims of a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iss: String,
    /// User id
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique per token so two tokens issued in the same second differ
    pub jti: String,
}

/// Token pair returned by login, login-link and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    users: Arc<dyn UserRepository>,
    store: Arc<dyn CacheLayer>,
    config: AuthConfig,
}

impl TokenService {
    pub fn new(users: Arc<dyn UserRepository>, store: Arc<dyn CacheLayer>, config: AuthConfig) -> Self {
        Self {
            users,
            store,
            config,
        }
    }

    /// Sign an access token for an existing user.
    ///
    /// The role is read from the database at signing time.
    pub async fn sign_access_token(&self, user_id: &str) -> Result<String, ServiceError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .context("Failed to load user for access token")?
            .ok_or_else(|| ServiceError::unauthorized("User no longer exists"))?;

        let now = Utc::now();
        let claims = AccessClaims {
            user_id: user.id.clone(),
            user_role: user.role,
            iss: self.config.issuer.clone(),
            aud: user.id,
            iat: now.timestamp(),
            exp: (now + ttl(self.config.access_token_ttl_seconds)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.access_token_secret.as_bytes()),
        )
        .context("Failed to sign access token")
        .map_err(Into::into)
    }

    /// Sign a refresh token and make it the user's live one.
    ///
    /// The store write always overwrites, so the token returned here is the
    /// one a later verification compares against.
    pub async fn sign_refresh_token(&self, user_id: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let lifetime = ttl(self.config.refresh_token_ttl_seconds);
        let claims = RefreshClaims {
            iss: self.config.issuer.clone(),
            aud: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_token_secret.as_bytes()),
        )
        .context("Failed to sign refresh token")?;

        self.store
            .set(
                &refresh_key(user_id),
                &token,
                Some(std::time::Duration::from_secs(self.config.refresh_token_ttl_seconds)),
            )
            .await
            .context("Failed to store refresh token")?;

        Ok(token)
    }

    pub async fn issue_pair(&self, user_id: &str) -> Result<TokenPair, ServiceError> {
        let access_token = self.sign_access_token(user_id).await?;
        let refresh_token = self.sign_refresh_token(user_id).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Check signature, issuer and expiry of an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, ServiceError> {
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_token_secret.as_bytes()),
            &self.validation(),
        )
        .map_err(|e| ServiceError::unauthorized(format!("Invalid access token: {}", e)))?;

        Ok(data.claims)
    }

    /// Verify a refresh token and return the user id it belongs to.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<String, ServiceError> {
        let data = decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_token_secret.as_bytes()),
            &self.validation(),
        )
        .map_err(|e| ServiceError::unauthorized(format!("Invalid refresh token: {}", e)))?;

        let user_id = data.claims.aud;
        let stored = self
            .store
            .get(&refresh_key(&user_id))
            .await
            .context("Failed to read refresh token")?;

        match stored {
            Some(stored) if stored == token => Ok(user_id),
            _ => Err(ServiceError::unauthorized("Refresh token is no longer valid")),
        }
    }

    /// Exchange a live refresh token for a new pair.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let user_id = self.verify_refresh_token(refresh_token).await?;
        self.issue_pair(&user_id).await
    }

    /// Drop the live refresh token of a user.
    pub async fn revoke(&self, user_id: &str) -> Result<(), ServiceError> {
        self.store
            .delete(&refresh_key(user_id))
            .await
            .context("Failed to revoke refresh token")?;
        Ok(())
    }

    // The audience is the user id, which is not known up front.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.validate_aud = false;
        validation.leeway = 0;
        validation
    }
}

// Capped at a century so the expiry timestamp cannot overflow.
fn ttl(seconds: u64) -> Duration {
    const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 3600;
    Duration::seconds(seconds.min(MAX_TTL_SECONDS) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            ..AuthConfig::default()
        }
    }

    async fn setup() -> (TokenService, Arc<MemoryCache>, User) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::boxed(pool);
        let user = users
            .create(&User::new(
                "editor@example.com".to_string(),
                "Editor".to_string(),
                "hash".to_string(),
                UserRole::Editor,
            ))
            .await
            .unwrap();
        let store = Arc::new(MemoryCache::new());
        let service = TokenService::new(users, store.clone(), test_auth_config());
        (service, store, user)
    }

    #[tokio::test]
    async fn test_access_token_round_trip() {
        let (service, _, user) = setup().await;

        let token = service.sign_access_token(&user.id).await.unwrap();
        let claims = service.verify_access_token(&token).unwrap();

        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.aud, user.id);
        assert_eq!(claims.user_role, UserRole::Editor);
        assert_eq!(claims.iss, "agrinews");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_access_token_for_missing_user() {
        let (service, _, _) = setup().await;
        let result = service.sign_access_token("missing").await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_access_token() {
        let (service, _, user) = setup().await;
        let refresh = service.sign_refresh_token(&user.id).await.unwrap();
        assert!(service.verify_access_token(&refresh).is_err());
        assert!(service.verify_access_token("garbage").is_err());
    }

    #[tokio::test]
    async fn test_rotation_invalidates_old_refresh_token() {
        let (service, _, user) = setup().await;

        let first = service.issue_pair(&user.id).await.unwrap();
        let second = service.rotate(&first.refresh_token).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(matches!(
            service.rotate(&first.refresh_token).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(service.verify_refresh_token(&second.refresh_token).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_last_signed_refresh_token_wins() {
        let (service, store, user) = setup().await;

        let a = service.sign_refresh_token(&user.id).await.unwrap();
        let b = service.sign_refresh_token(&user.id).await.unwrap();

        assert_eq!(store.get(&refresh_key(&user.id)).await.unwrap().as_deref(), Some(b.as_str()));
        assert!(service.verify_refresh_token(&a).await.is_err());
        assert!(service.verify_refresh_token(&b).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke() {
        let (service, _, user) = setup().await;
        let token = service.sign_refresh_token(&user.id).await.unwrap();

        service.revoke(&user.id).await.unwrap();
        service.revoke(&user.id).await.unwrap();

        assert!(service.verify_refresh_token(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let (service, store, user) = setup().await;
        let mut other_config = test_auth_config();
        other_config.issuer = "someone-else".to_string();
        let other = TokenService::new(
            Arc::clone(&service.users),
            store,
            other_config,
        );

        let token = other.sign_access_token(&user.id).await.unwrap();
        assert!(service.verify_access_token(&token).is_err());
    }
}
