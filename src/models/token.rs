//! One-time token model
//!
//! Email verification, login-link and password-reset tokens share one
//! shape: a hashed secret bound to a user, valid until `expires_at` and
//! consumed on first use.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    Login,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::Login => "login",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }

    /// How long a freshly issued token stays valid.
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::EmailVerification => Duration::hours(6),
            TokenPurpose::Login => Duration::minutes(15),
            TokenPurpose::PasswordReset => Duration::hours(1),
        }
    }
}

impl FromStr for TokenPurpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(TokenPurpose::EmailVerification),
            "login" => Ok(TokenPurpose::Login),
            "password_reset" => Ok(TokenPurpose::PasswordReset),
            _ => Err(anyhow::anyhow!("Invalid token purpose: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OneTimeToken {
    pub id: String,
    pub user_id: String,
    pub purpose: TokenPurpose,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn new(user_id: String, purpose: TokenPurpose, token_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            purpose,
            token_hash,
            created_at: now,
            expires_at: now + purpose.lifetime(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_not_expired() {
        let token = OneTimeToken::new("u1".to_string(), TokenPurpose::Login, "h".to_string());
        assert!(!token.is_expired());
        assert_eq!(token.expires_at - token.created_at, Duration::minutes(15));
    }

    #[test]
    fn test_expired_token() {
        let mut token =
            OneTimeToken::new("u1".to_string(), TokenPurpose::PasswordReset, "h".to_string());
        token.expires_at = Utc::now() - Duration::seconds(1);
        assert!(token.is_expired());
    }

    #[test]
    fn test_purpose_parse() {
        for purpose in [
            TokenPurpose::EmailVerification,
            TokenPurpose::Login,
            TokenPurpose::PasswordReset,
        ] {
            assert_eq!(purpose.as_str().parse::<TokenPurpose>().unwrap(), purpose);
        }
        assert!("other".parse::<TokenPurpose>().is_err());
    }
}
