//! Database migrations
//!
//! Migrations are embedded as SQL strings with one variant per backend and
//! applied in version order. Applied versions are tracked in `_migrations`.
//!
//! Ids are UUID strings (`VARCHAR(36)`) on both backends. Child items keep a
//! `position` column that fixes their order within the parent.

use anyhow::{Context, Result};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique, increasing version number
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id VARCHAR(36) PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                verified BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id VARCHAR(36) PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'user',
                verified BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
        "#,
    },
    // Email verification, login link and password reset tokens
    Migration {
        version: 2,
        name: "create_one_time_tokens",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS one_time_tokens (
                id VARCHAR(36) PRIMARY KEY,
                user_id VARCHAR(36) NOT NULL,
                purpose VARCHAR(32) NOT NULL,
                token_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_one_time_tokens_user ON one_time_tokens(user_id, purpose);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS one_time_tokens (
                id VARCHAR(36) PRIMARY KEY,
                user_id VARCHAR(36) NOT NULL,
                purpose VARCHAR(32) NOT NULL,
                token_hash VARCHAR(255) NOT NULL,
                created_at DATETIME NOT NULL,
                expires_at DATETIME NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_one_time_tokens_user ON one_time_tokens(user_id, purpose);
        "#,
    },
    Migration {
        version: 3,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id VARCHAR(36) PRIMARY KEY,
                vi_name VARCHAR(255) NOT NULL UNIQUE,
                jp_name VARCHAR(255) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id VARCHAR(36) PRIMARY KEY,
                vi_name VARCHAR(255) NOT NULL UNIQUE,
                jp_name VARCHAR(255) NOT NULL UNIQUE,
                created_at DATETIME NOT NULL
            );
        "#,
    },
    Migration {
        version: 4,
        name: "create_news",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS news (
                id VARCHAR(36) PRIMARY KEY,
                vi_title VARCHAR(500) NOT NULL,
                jp_title VARCHAR(500) NOT NULL,
                vi_description TEXT NOT NULL,
                jp_description TEXT NOT NULL,
                vi_poster VARCHAR(500) NOT NULL,
                jp_poster VARCHAR(500) NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_news_created_at ON news(created_at);
            CREATE TABLE IF NOT EXISTS news_items (
                id VARCHAR(36) PRIMARY KEY,
                parent_id VARCHAR(36) NOT NULL,
                position INTEGER NOT NULL,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                image VARCHAR(500),
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES news(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_news_items_parent ON news_items(parent_id, position);
            CREATE TABLE IF NOT EXISTS news_tags (
                news_id VARCHAR(36) NOT NULL,
                tag_id VARCHAR(36) NOT NULL,
                PRIMARY KEY (news_id, tag_id),
                FOREIGN KEY (news_id) REFERENCES news(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_news_tags_tag ON news_tags(tag_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS news (
                id VARCHAR(36) PRIMARY KEY,
                vi_title VARCHAR(500) NOT NULL,
                jp_title VARCHAR(500) NOT NULL,
                vi_description TEXT NOT NULL,
                jp_description TEXT NOT NULL,
                vi_poster VARCHAR(500) NOT NULL,
                jp_poster VARCHAR(500) NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
            CREATE INDEX idx_news_created_at ON news(created_at);
            CREATE TABLE IF NOT EXISTS news_items (
                id VARCHAR(36) PRIMARY KEY,
                parent_id VARCHAR(36) NOT NULL,
                position BIGINT NOT NULL,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                image VARCHAR(500),
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES news(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_news_items_parent ON news_items(parent_id, position);
            CREATE TABLE IF NOT EXISTS news_tags (
                news_id VARCHAR(36) NOT NULL,
                tag_id VARCHAR(36) NOT NULL,
                PRIMARY KEY (news_id, tag_id),
                FOREIGN KEY (news_id) REFERENCES news(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_agriculture",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS agriculture (
                id VARCHAR(36) PRIMARY KEY,
                vi_title VARCHAR(500) NOT NULL,
                jp_title VARCHAR(500) NOT NULL,
                vi_description TEXT NOT NULL,
                jp_description TEXT NOT NULL,
                image VARCHAR(500) NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE TABLE IF NOT EXISTS agriculture_items (
                id VARCHAR(36) PRIMARY KEY,
                parent_id VARCHAR(36) NOT NULL,
                position INTEGER NOT NULL,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                image VARCHAR(500),
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES agriculture(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_agriculture_items_parent ON agriculture_items(parent_id, position);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS agriculture (
                id VARCHAR(36) PRIMARY KEY,
                vi_title VARCHAR(500) NOT NULL,
                jp_title VARCHAR(500) NOT NULL,
                vi_description TEXT NOT NULL,
                jp_description TEXT NOT NULL,
                image VARCHAR(500) NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
            CREATE TABLE IF NOT EXISTS agriculture_items (
                id VARCHAR(36) PRIMARY KEY,
                parent_id VARCHAR(36) NOT NULL,
                position BIGINT NOT NULL,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                image VARCHAR(500),
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES agriculture(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_agriculture_items_parent ON agriculture_items(parent_id, position);
        "#,
    },
    Migration {
        version: 6,
        name: "create_personnel",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS personnel (
                id VARCHAR(36) PRIMARY KEY,
                vi_name VARCHAR(255) NOT NULL,
                jp_name VARCHAR(255) NOT NULL,
                vi_position VARCHAR(255) NOT NULL,
                jp_position VARCHAR(255) NOT NULL,
                image VARCHAR(500) NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS personnel (
                id VARCHAR(36) PRIMARY KEY,
                vi_name VARCHAR(255) NOT NULL,
                jp_name VARCHAR(255) NOT NULL,
                vi_position VARCHAR(255) NOT NULL,
                jp_position VARCHAR(255) NOT NULL,
                image VARCHAR(500) NOT NULL,
                sort_order BIGINT NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
        "#,
    },
    Migration {
        version: 7,
        name: "create_partners",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS partners (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                logo VARCHAR(500) NOT NULL,
                website VARCHAR(500),
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS partners (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                logo VARCHAR(500) NOT NULL,
                website VARCHAR(500),
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
        "#,
    },
    Migration {
        version: 8,
        name: "create_cooperatives",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS cooperatives (
                id VARCHAR(36) PRIMARY KEY,
                vi_name VARCHAR(255) NOT NULL,
                jp_name VARCHAR(255) NOT NULL,
                vi_address VARCHAR(500) NOT NULL,
                jp_address VARCHAR(500) NOT NULL,
                vi_description TEXT NOT NULL,
                jp_description TEXT NOT NULL,
                image VARCHAR(500) NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS cooperatives (
                id VARCHAR(36) PRIMARY KEY,
                vi_name VARCHAR(255) NOT NULL,
                jp_name VARCHAR(255) NOT NULL,
                vi_address VARCHAR(500) NOT NULL,
                jp_address VARCHAR(500) NOT NULL,
                vi_description TEXT NOT NULL,
                jp_description TEXT NOT NULL,
                image VARCHAR(500) NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
        "#,
    },
    Migration {
        version: 9,
        name: "create_feedbacks",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS feedbacks (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                vi_position VARCHAR(255) NOT NULL,
                jp_position VARCHAR(255) NOT NULL,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                avatar VARCHAR(500),
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS feedbacks (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                vi_position VARCHAR(255) NOT NULL,
                jp_position VARCHAR(255) NOT NULL,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                avatar VARCHAR(500),
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
        "#,
    },
    Migration {
        version: 10,
        name: "create_contacts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50),
                company VARCHAR(255),
                subject VARCHAR(255),
                message TEXT NOT NULL,
                handled BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_created_at ON contacts(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL,
                phone VARCHAR(50),
                company VARCHAR(255),
                subject VARCHAR(255),
                message TEXT NOT NULL,
                handled BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX idx_contacts_created_at ON contacts(created_at);
        "#,
    },
    Migration {
        version: 11,
        name: "create_years",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS years (
                id VARCHAR(36) PRIMARY KEY,
                year INTEGER NOT NULL UNIQUE,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS years (
                id VARCHAR(36) PRIMARY KEY,
                year BIGINT NOT NULL UNIQUE,
                vi_content TEXT NOT NULL,
                jp_content TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );
        "#,
    },
];

/// Apply every pending migration in version order.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied.contains(&i64::from(migration.version)) {
            tracing::info!("Applying migration {}: {}", migration.version, migration.name);
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i64>> {
    let versions = on_pool!(pool, conn => {
        sqlx::query_scalar::<_, i64>("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(conn)
            .await?
    });
    Ok(versions)
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    on_pool!(pool, conn => {
        for statement in split_sql_statements(sql) {
            sqlx::query(statement)
                .execute(conn)
                .await
                .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
        }

        sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
            .bind(i64::from(migration.version))
            .bind(migration.name)
            .execute(conn)
            .await?;
    });

    Ok(())
}

fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = applied_versions(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(pending_count(&pool).await.unwrap(), 0);

        let applied_again = run_migrations(&pool).await.expect("Second run failed");
        assert_eq!(applied_again, 0);
    }

    #[tokio::test]
    async fn test_all_tables_created() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let sqlite_pool = pool.as_sqlite().unwrap();
        for table in [
            "users",
            "one_time_tokens",
            "tags",
            "news",
            "news_items",
            "news_tags",
            "agriculture",
            "agriculture_items",
            "personnel",
            "partners",
            "cooperatives",
            "feedbacks",
            "contacts",
            "years",
        ] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_news_items_cascade_with_parent() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let sqlite_pool = pool.as_sqlite().unwrap();
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO news (id, vi_title, jp_title, vi_description, jp_description, vi_poster, jp_poster, created_at, updated_at) \
             VALUES ('n1', 't', 't', 'd', 'd', 'p', 'p', ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(sqlite_pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO news_items (id, parent_id, position, vi_content, jp_content, created_at, updated_at) \
             VALUES ('i1', 'n1', 0, 'c', 'c', ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(sqlite_pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM news WHERE id = 'n1'")
            .execute(sqlite_pool)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_items")
            .fetch_one(sqlite_pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_unique_email() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let sqlite_pool = pool.as_sqlite().unwrap();
        let now = chrono::Utc::now();

        let insert = "INSERT INTO users (id, email, name, password_hash, created_at, updated_at) VALUES (?, 'a@example.com', 'A', 'h', ?, ?)";
        sqlx::query(insert)
            .bind("u1")
            .bind(now)
            .bind(now)
            .execute(sqlite_pool)
            .await
            .unwrap();
        let duplicate = sqlx::query(insert)
            .bind("u2")
            .bind(now)
            .bind(now)
            .execute(sqlite_pool)
            .await;
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let statements = split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT);");
        assert_eq!(statements.len(), 2);

        let statements = split_sql_statements("-- Comment\nCREATE TABLE a (id INT);\n-- trailing");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
