//! Configuration management
//!
//! Configuration is loaded from:
//! - config.yml file
//! - Environment variables prefixed with `AGRINEWS_` (override file settings)
//!
//! Missing optional values are filled with sensible defaults. Secrets have no
//! usable default; `Config::validate` rejects a configuration without them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin of the public site / admin frontend
    #[serde(default = "default_frontend_url")]
    pub cors_origin: String,
    /// Base URL used to build links in verification and reset mails
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_frontend_url(),
            frontend_url: default_frontend_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/agrinews.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Key-value store configuration (detail cache and refresh tokens)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache driver (memory or redis)
    #[serde(default)]
    pub driver: CacheDriver,
    /// Redis connection URL, required for the redis driver
    #[serde(default)]
    pub redis_url: Option<String>,
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// In-process store (default)
    #[default]
    Memory,
    Redis,
}

/// Bearer token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    #[serde(default)]
    pub access_token_secret: String,
    /// HMAC secret for refresh tokens
    #[serde(default)]
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds (default: 1 hour)
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_seconds: u64,
    /// Refresh token lifetime in seconds (default: 365 days)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_seconds: u64,
    /// `iss` claim written into and required from every token
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            access_token_ttl_seconds: default_access_ttl(),
            refresh_token_ttl_seconds: default_refresh_ttl(),
            issuer: default_issuer(),
        }
    }
}

fn default_access_ttl() -> u64 {
    3600
}

fn default_refresh_ttl() -> u64 {
    365 * 24 * 3600
}

fn default_issuer() -> String {
    "agrinews".to_string()
}

/// Outgoing mail configuration.
///
/// An empty `smtp_host` selects the log-only mailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Inbox receiving recruitment applications
    #[serde(default = "default_hr_inbox")]
    pub hr_inbox: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: default_from_address(),
            from_name: default_from_name(),
            hr_inbox: default_hr_inbox(),
        }
    }
}

fn default_smtp_port() -> u16 {
    465
}

fn default_from_address() -> String {
    "no-reply@localhost".to_string()
}

fn default_from_name() -> String {
    "Agrinews".to_string()
}

fn default_hr_inbox() -> String {
    "hr@localhost".to_string()
}

impl MailConfig {
    pub fn is_smtp_configured(&self) -> bool {
        !self.smtp_host.trim().is_empty()
    }
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Allowed MIME types for recruitment CV attachments
    #[serde(default = "default_document_types")]
    pub document_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
            document_types: default_document_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
    ]
}

fn default_document_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "application/msword".to_string(),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
    ]
}

impl UploadConfig {
    /// Check if an image MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Check if a CV attachment MIME type is allowed
    pub fn is_document_allowed(&self, mime_type: &str) -> bool {
        self.document_types.iter().any(|t| t == mime_type)
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - AGRINEWS_SERVER_HOST, AGRINEWS_SERVER_PORT
    /// - AGRINEWS_SERVER_CORS_ORIGIN, AGRINEWS_SERVER_FRONTEND_URL
    /// - AGRINEWS_DATABASE_DRIVER, AGRINEWS_DATABASE_URL
    /// - AGRINEWS_CACHE_DRIVER, AGRINEWS_CACHE_REDIS_URL
    /// - AGRINEWS_ACCESS_TOKEN_SECRET, AGRINEWS_REFRESH_TOKEN_SECRET
    /// - AGRINEWS_ACCESS_TOKEN_TTL_SECONDS, AGRINEWS_REFRESH_TOKEN_TTL_SECONDS
    /// - AGRINEWS_MAIL_SMTP_HOST, AGRINEWS_MAIL_SMTP_PORT
    /// - AGRINEWS_MAIL_SMTP_USERNAME, AGRINEWS_MAIL_SMTP_PASSWORD
    /// - AGRINEWS_MAIL_HR_INBOX
    /// - AGRINEWS_UPLOAD_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("AGRINEWS_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("AGRINEWS_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("AGRINEWS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(frontend_url) = std::env::var("AGRINEWS_SERVER_FRONTEND_URL") {
            self.server.frontend_url = frontend_url;
        }

        if let Ok(driver) = std::env::var("AGRINEWS_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("AGRINEWS_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("AGRINEWS_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {}
            }
        }
        if let Ok(redis_url) = std::env::var("AGRINEWS_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }

        if let Ok(secret) = std::env::var("AGRINEWS_ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = secret;
        }
        if let Ok(secret) = std::env::var("AGRINEWS_REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = secret;
        }
        if let Ok(ttl) = std::env::var("AGRINEWS_ACCESS_TOKEN_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.auth.access_token_ttl_seconds = ttl;
            }
        }
        if let Ok(ttl) = std::env::var("AGRINEWS_REFRESH_TOKEN_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.auth.refresh_token_ttl_seconds = ttl;
            }
        }

        if let Ok(host) = std::env::var("AGRINEWS_MAIL_SMTP_HOST") {
            self.mail.smtp_host = host;
        }
        if let Ok(port) = std::env::var("AGRINEWS_MAIL_SMTP_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.mail.smtp_port = port;
            }
        }
        if let Ok(username) = std::env::var("AGRINEWS_MAIL_SMTP_USERNAME") {
            self.mail.smtp_username = username;
        }
        if let Ok(password) = std::env::var("AGRINEWS_MAIL_SMTP_PASSWORD") {
            self.mail.smtp_password = password;
        }
        if let Ok(inbox) = std::env::var("AGRINEWS_MAIL_HR_INBOX") {
            self.mail.hr_inbox = inbox;
        }

        if let Ok(path) = std::env::var("AGRINEWS_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.access_token_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.access_token_secret must be set".to_string(),
            ));
        }
        if self.auth.refresh_token_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.refresh_token_secret must be set".to_string(),
            ));
        }
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(ConfigError::ValidationError(
                "access and refresh token secrets must differ".to_string(),
            ));
        }
        if self.auth.access_token_ttl_seconds == 0 || self.auth.refresh_token_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.cache.driver == CacheDriver::Redis
            && self.cache.redis_url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "cache.redis_url is required for the redis driver".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn env_port_overrides_file_port(file_port in 1024u16..60000, env_port in 1024u16..60000) {
            prop_assume!(file_port != env_port);
            let _guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            writeln!(file, "server:\n  port: {}", file_port).expect("Failed to write");

            std::env::set_var("AGRINEWS_SERVER_PORT", env_port.to_string());
            let config = Config::load_with_env(file.path()).expect("Failed to load config");
            std::env::remove_var("AGRINEWS_SERVER_PORT");

            prop_assert_eq!(config.server.port, env_port);
        }
    }
}
