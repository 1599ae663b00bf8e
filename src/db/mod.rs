//! Database layer
//!
//! Supports SQLite (default, single-binary deployment) and MySQL. The driver
//! is selected from configuration and hidden behind [`DatabasePool`].
//!
//! # Usage
//!
//! ```ignore
//! use agrinews::config::DatabaseConfig;
//! use agrinews::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

/// Run `$body` against the typed pool behind a [`DynDatabasePool`].
///
/// Both backends use `?` placeholders, so one query text serves both; the
/// body is expanded once per driver with `$conn` bound to the typed pool.
/// Must be used inside a function returning `anyhow::Result`.
///
/// Defined ahead of the submodules, which reach it by textual scope.
macro_rules! on_pool {
    ($pool:expr, $conn:ident => $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $conn = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool unavailable"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $conn = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool unavailable"))?;
                $body
            }
        }
    };
}

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
