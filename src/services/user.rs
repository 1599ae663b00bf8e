//! User service
//!
//! Registration with email verification, password and login-link sign-in,
//! token refresh and logout, password reset and user administration.
//!
//! One-time links carry a random secret; only its Argon2 hash is stored.
//! Consuming a link deletes its record, and only the caller whose delete
//! removed the row is allowed to proceed.

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::{OneTimeTokenRepository, UserRepository};
use crate::models::{
    ChangePasswordInput, ListParams, LoginInput, OneTimeToken, PagedResult, RegisterInput,
    ResetPasswordInput, TokenPurpose, User, UserRole,
};
use crate::services::error::{required, validate_email, write_error, ServiceError};
use crate::services::mailer::{Mail, Mailer};
use crate::services::password::{generate_secret, hash_password, verify_password};
use crate::services::token::{TokenPair, TokenService};

const MIN_PASSWORD_LENGTH: usize = 6;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    one_time_tokens: Arc<dyn OneTimeTokenRepository>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        one_time_tokens: Arc<dyn OneTimeTokenRepository>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            one_time_tokens,
            tokens,
            mailer,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register an unverified user and mail the verification link.
    ///
    /// The first user of the system becomes an admin.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the passwords differ or the email is taken
    /// - `BadRequest` for missing or malformed fields
    pub async fn register(&self, input: RegisterInput) -> Result<User, ServiceError> {
        let email = validate_email(&input.email)?;
        let name = required("name", &input.name)?;
        validate_password(&input.password)?;
        if input.password != input.confirm_password {
            return Err(ServiceError::conflict("Passwords do not match"));
        }

        let taken = format!("Email '{}' is already registered", email);
        if self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(ServiceError::conflict(taken));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .users
            .create_promoting_first(&User::new(email, name, password_hash, UserRole::User))
            .await
            .map_err(|e| write_error(e, "Failed to create user", &taken))?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        self.send_link(&user, TokenPurpose::EmailVerification).await?;

        Ok(user)
    }

    pub async fn verify_email(&self, user_id: &str, secret: &str) -> Result<User, ServiceError> {
        self.consume(user_id, TokenPurpose::EmailVerification, secret)
            .await?;
        self.users
            .mark_verified(user_id)
            .await
            .context("Failed to mark user verified")?;
        self.get_user(user_id).await
    }

    /// Replace the pending verification link of an unverified user.
    pub async fn resend_verification(&self, email: &str) -> Result<(), ServiceError> {
        let user = self.user_by_email(email).await?;
        if user.verified {
            return Err(ServiceError::bad_request("Email is already verified"));
        }
        self.send_link(&user, TokenPurpose::EmailVerification).await
    }

    /// Password sign-in.
    ///
    /// The verified flag is checked before the password so an unverified
    /// account never receives tokens.
    pub async fn login(&self, input: LoginInput) -> Result<(User, TokenPair), ServiceError> {
        let user = self.user_by_email(&input.email).await?;
        if !user.verified {
            return Err(ServiceError::bad_request(
                "Email is not verified. Please check your inbox.",
            ));
        }
        if !verify_password(&input.password, &user.password_hash)? {
            return Err(ServiceError::unauthorized("Invalid email or password"));
        }

        let pair = self.tokens.issue_pair(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, pair))
    }

    /// Mail a short-lived sign-in link to a verified user.
    pub async fn request_login_link(&self, email: &str) -> Result<(), ServiceError> {
        let user = self.user_by_email(email).await?;
        if !user.verified {
            return Err(ServiceError::bad_request("Email is not verified"));
        }
        self.send_link(&user, TokenPurpose::Login).await
    }

    pub async fn login_with_link(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<(User, TokenPair), ServiceError> {
        self.consume(user_id, TokenPurpose::Login, secret).await?;
        let user = self.get_user(user_id).await?;
        let pair = self.tokens.issue_pair(&user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in with link");
        Ok((user, pair))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        self.tokens.rotate(refresh_token).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let user_id = self.tokens.verify_refresh_token(refresh_token).await?;
        self.tokens.revoke(&user_id).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Mail a password-reset link, replacing any pending one.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let user = self.user_by_email(email).await?;
        self.send_link(&user, TokenPurpose::PasswordReset).await
    }

    /// Set a new password from a reset link.
    ///
    /// The live refresh token is revoked so other sessions have to sign in
    /// again.
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<(), ServiceError> {
        validate_password(&input.password)?;
        if input.password != input.confirm_password {
            return Err(ServiceError::conflict("Passwords do not match"));
        }

        self.consume(&input.user_id, TokenPurpose::PasswordReset, &input.token)
            .await?;

        let password_hash = hash_password(&input.password)?;
        self.users
            .update_password(&input.user_id, &password_hash)
            .await
            .context("Failed to update password")?;
        self.tokens.revoke(&input.user_id).await?;

        tracing::info!(user_id = %input.user_id, "Password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;
        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(ServiceError::unauthorized("Current password is incorrect"));
        }
        validate_password(&input.password)?;
        if input.password != input.confirm_password {
            return Err(ServiceError::conflict("Passwords do not match"));
        }

        let password_hash = hash_password(&input.password)?;
        self.users
            .update_password(user_id, &password_hash)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, ServiceError> {
        self.users
            .get_by_id(user_id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    pub async fn list_users(&self, params: &ListParams) -> Result<PagedResult<User>, ServiceError> {
        let (users, total) = self.users.list(params).await.context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Change another user's role; admins cannot demote themselves.
    pub async fn update_role(
        &self,
        acting_user_id: &str,
        user_id: &str,
        role: UserRole,
    ) -> Result<User, ServiceError> {
        let user = self.get_user(user_id).await?;
        if user.id == acting_user_id && role != UserRole::Admin {
            return Err(ServiceError::Forbidden(
                "Administrators cannot demote themselves".to_string(),
            ));
        }
        self.users
            .update_role(user_id, role)
            .await
            .context("Failed to update role")?;
        self.get_user(user_id).await
    }

    async fn user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        let email = validate_email(email)?;
        self.users
            .get_by_email(&email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }

    /// Issue a fresh one-time token of `purpose` and mail its link.
    async fn send_link(&self, user: &User, purpose: TokenPurpose) -> Result<(), ServiceError> {
        self.one_time_tokens
            .delete_for_user(&user.id, purpose)
            .await
            .context("Failed to drop pending tokens")?;

        let secret = generate_secret();
        let token = OneTimeToken::new(user.id.clone(), purpose, hash_password(&secret)?);
        self.one_time_tokens
            .create(&token)
            .await
            .context("Failed to store one-time token")?;

        let mail = match purpose {
            TokenPurpose::EmailVerification => {
                Mail::verification(&user.email, &self.link("verify", &user.id, &secret))
            }
            TokenPurpose::Login => {
                Mail::login_link(&user.email, &self.link("login-link", &user.id, &secret))
            }
            TokenPurpose::PasswordReset => {
                Mail::password_reset(&user.email, &self.link("reset-password", &user.id, &secret))
            }
        };
        self.mailer.send(mail).await?;

        tracing::info!(user_id = %user.id, purpose = purpose.as_str(), "One-time link sent");
        Ok(())
    }

    fn link(&self, route: &str, user_id: &str, secret: &str) -> String {
        format!("{}/{}/{}/{}", self.frontend_url, route, user_id, secret)
    }

    /// Check and consume a one-time token.
    ///
    /// - no record: `NotFound`
    /// - expired: record deleted, `NotAcceptable`
    /// - wrong secret: `BadRequest`
    async fn consume(
        &self,
        user_id: &str,
        purpose: TokenPurpose,
        secret: &str,
    ) -> Result<(), ServiceError> {
        let token = self
            .one_time_tokens
            .find(user_id, purpose)
            .await
            .context("Failed to load one-time token")?
            .ok_or_else(|| ServiceError::not_found("Link is invalid or has already been used"))?;

        if token.is_expired() {
            self.one_time_tokens
                .delete(&token.id)
                .await
                .context("Failed to delete expired token")?;
            return Err(ServiceError::NotAcceptable("Link has expired".to_string()));
        }

        if !verify_password(secret, &token.token_hash)? {
            return Err(ServiceError::bad_request("Link is invalid"));
        }

        let removed = self
            .one_time_tokens
            .delete(&token.id)
            .await
            .context("Failed to consume one-time token")?;
        if !removed {
            return Err(ServiceError::not_found("Link has already been used"));
        }
        Ok(())
    }
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::AuthConfig;
    use crate::db::repositories::{SqlxOneTimeTokenRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::mailer::RecordingMailer;
    use chrono::Utc;

    struct Fixture {
        service: UserService,
        mailer: Arc<RecordingMailer>,
        one_time_tokens: Arc<dyn OneTimeTokenRepository>,
        users: Arc<dyn UserRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let users = SqlxUserRepository::boxed(pool.clone());
        let one_time_tokens = SqlxOneTimeTokenRepository::boxed(pool);
        let config = AuthConfig {
            access_token_secret: "a".to_string(),
            refresh_token_secret: "r".to_string(),
            ..AuthConfig::default()
        };
        let tokens = Arc::new(TokenService::new(
            users.clone(),
            Arc::new(MemoryCache::new()),
            config,
        ));
        let mailer = Arc::new(RecordingMailer::default());
        let service = UserService::new(
            users.clone(),
            one_time_tokens.clone(),
            tokens,
            mailer.clone(),
            "https://site.example/",
        );
        Fixture {
            service,
            mailer,
            one_time_tokens,
            users,
        }
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            name: "Nguyen".to_string(),
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
        }
    }

    /// Pull `(user_id, secret)` out of the last link mailed to `email`
    fn link_parts(mailer: &RecordingMailer, email: &str) -> (String, String) {
        let link = mailer.last_link_to(email).unwrap();
        let mut parts = link.rsplit('/');
        let secret = parts.next().unwrap().to_string();
        let user_id = parts.next().unwrap().to_string();
        (user_id, secret)
    }

    async fn registered_and_verified(f: &Fixture, email: &str) -> User {
        f.service.register(register_input(email)).await.unwrap();
        let (user_id, secret) = link_parts(&f.mailer, email);
        f.service.verify_email(&user_id, &secret).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let f = setup().await;
        let first = f.service.register(register_input("a@example.com")).await.unwrap();
        let second = f.service.register(register_input("b@example.com")).await.unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::User);
        assert!(!first.verified);
    }

    #[tokio::test]
    async fn test_concurrent_first_registrations_yield_one_admin() {
        let f = setup().await;
        let (a, b) = tokio::join!(
            f.service.register(register_input("a@example.com")),
            f.service.register(register_input("b@example.com"))
        );

        let roles = [a.unwrap().role, b.unwrap().role];
        assert_eq!(roles.iter().filter(|r| **r == UserRole::Admin).count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration_conflicts() {
        let f = setup().await;
        let (a, b) = tokio::join!(
            f.service.register(register_input("a@example.com")),
            f.service.register(register_input("a@example.com"))
        );

        assert!(a.is_ok() != b.is_ok());
        assert!(matches!(a.err().or(b.err()), Some(ServiceError::Conflict(_))));
        assert_eq!(f.users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_password_mismatch_creates_nothing() {
        let f = setup().await;
        let mut input = register_input("a@example.com");
        input.confirm_password = "different1".to_string();

        let result = f.service.register(input).await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(f.users.count().await.unwrap(), 0);
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let f = setup().await;
        f.service.register(register_input("a@example.com")).await.unwrap();
        let result = f.service.register(register_input("A@Example.com")).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_verification_link_is_single_use() {
        let f = setup().await;
        f.service.register(register_input("a@example.com")).await.unwrap();
        let link = f.mailer.last_link_to("a@example.com").unwrap();
        assert!(link.starts_with("https://site.example/verify/"));

        let (user_id, secret) = link_parts(&f.mailer, "a@example.com");
        let user = f.service.verify_email(&user_id, &secret).await.unwrap();
        assert!(user.verified);

        let again = f.service.verify_email(&user_id, &secret).await;
        assert!(matches!(again, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_verification_wrong_secret_keeps_token() {
        let f = setup().await;
        f.service.register(register_input("a@example.com")).await.unwrap();
        let (user_id, secret) = link_parts(&f.mailer, "a@example.com");

        let wrong = f.service.verify_email(&user_id, "0000").await;
        assert!(matches!(wrong, Err(ServiceError::BadRequest(_))));

        assert!(f.service.verify_email(&user_id, &secret).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_deleted() {
        let f = setup().await;
        let user = f.service.register(register_input("a@example.com")).await.unwrap();
        let (_, secret) = link_parts(&f.mailer, "a@example.com");

        // Replace the pending token with an already expired one
        f.one_time_tokens
            .delete_for_user(&user.id, TokenPurpose::EmailVerification)
            .await
            .unwrap();
        let mut expired = OneTimeToken::new(
            user.id.clone(),
            TokenPurpose::EmailVerification,
            hash_password(&secret).unwrap(),
        );
        expired.expires_at = Utc::now() - chrono::Duration::minutes(1);
        f.one_time_tokens.create(&expired).await.unwrap();

        let result = f.service.verify_email(&user.id, &secret).await;
        assert!(matches!(result, Err(ServiceError::NotAcceptable(_))));
        assert!(f
            .one_time_tokens
            .find(&user.id, TokenPurpose::EmailVerification)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resend_replaces_pending_link() {
        let f = setup().await;
        f.service.register(register_input("a@example.com")).await.unwrap();
        let (user_id, first_secret) = link_parts(&f.mailer, "a@example.com");

        f.service.resend_verification("a@example.com").await.unwrap();
        let (_, second_secret) = link_parts(&f.mailer, "a@example.com");

        let stale = f.service.verify_email(&user_id, &first_secret).await;
        assert!(matches!(stale, Err(ServiceError::BadRequest(_))));
        assert!(f.service.verify_email(&user_id, &second_secret).await.is_ok());

        let verified = f.service.resend_verification("a@example.com").await;
        assert!(matches!(verified, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let f = setup().await;
        f.service.register(register_input("a@example.com")).await.unwrap();

        let unknown = f
            .service
            .login(LoginInput {
                email: "nobody@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));

        let unverified = f
            .service
            .login(LoginInput {
                email: "a@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await;
        assert!(matches!(unverified, Err(ServiceError::BadRequest(_))));

        let (user_id, secret) = link_parts(&f.mailer, "a@example.com");
        f.service.verify_email(&user_id, &secret).await.unwrap();

        let wrong = f
            .service
            .login(LoginInput {
                email: "a@example.com".to_string(),
                password: "nope-nope".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(ServiceError::Unauthorized(_))));

        let (user, pair) = f
            .service
            .login(LoginInput {
                email: "a@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, user_id);
        assert!(!pair.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_link_flow() {
        let f = setup().await;
        let user = registered_and_verified(&f, "a@example.com").await;

        f.service.request_login_link("a@example.com").await.unwrap();
        let link = f.mailer.last_link_to("a@example.com").unwrap();
        assert!(link.contains("/login-link/"));
        let (user_id, secret) = link_parts(&f.mailer, "a@example.com");

        let (logged_in, _) = f.service.login_with_link(&user_id, &secret).await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(f.service.login_with_link(&user_id, &secret).await.is_err());
    }

    #[tokio::test]
    async fn test_password_reset_revokes_refresh_token() {
        let f = setup().await;
        registered_and_verified(&f, "a@example.com").await;
        let (_, pair) = f
            .service
            .login(LoginInput {
                email: "a@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();

        f.service.forgot_password("a@example.com").await.unwrap();
        let (user_id, secret) = link_parts(&f.mailer, "a@example.com");

        let mismatch = f
            .service
            .reset_password(ResetPasswordInput {
                user_id: user_id.clone(),
                token: secret.clone(),
                password: "newpass123".to_string(),
                confirm_password: "other12345".to_string(),
            })
            .await;
        assert!(matches!(mismatch, Err(ServiceError::Conflict(_))));

        f.service
            .reset_password(ResetPasswordInput {
                user_id: user_id.clone(),
                token: secret,
                password: "newpass123".to_string(),
                confirm_password: "newpass123".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            f.service.refresh(&pair.refresh_token).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(f
            .service
            .login(LoginInput {
                email: "a@example.com".to_string(),
                password: "newpass123".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_logout_revokes() {
        let f = setup().await;
        registered_and_verified(&f, "a@example.com").await;
        let (_, pair) = f
            .service
            .login(LoginInput {
                email: "a@example.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();

        f.service.logout(&pair.refresh_token).await.unwrap();
        assert!(f.service.refresh(&pair.refresh_token).await.is_err());
        assert!(f.service.logout(&pair.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_change_password() {
        let f = setup().await;
        let user = registered_and_verified(&f, "a@example.com").await;

        let wrong = f
            .service
            .change_password(
                &user.id,
                ChangePasswordInput {
                    current_password: "wrong-one".to_string(),
                    password: "newpass123".to_string(),
                    confirm_password: "newpass123".to_string(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(ServiceError::Unauthorized(_))));

        f.service
            .change_password(
                &user.id,
                ChangePasswordInput {
                    current_password: "secret123".to_string(),
                    password: "newpass123".to_string(),
                    confirm_password: "newpass123".to_string(),
                },
            )
            .await
            .unwrap();
        let stored = f.users.get_by_id(&user.id).await.unwrap().unwrap();
        assert!(verify_password("newpass123", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_update_role() {
        let f = setup().await;
        let admin = registered_and_verified(&f, "admin@example.com").await;
        let other = registered_and_verified(&f, "b@example.com").await;

        let promoted = f
            .service
            .update_role(&admin.id, &other.id, UserRole::Editor)
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Editor);

        let demote_self = f.service.update_role(&admin.id, &admin.id, UserRole::User).await;
        assert!(matches!(demote_self, Err(ServiceError::Forbidden(_))));

        let page = f.service.list_users(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }
}
