//! Timeline year repository

use crate::db::DynDatabasePool;
use crate::models::Year;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait YearRepository: Send + Sync {
    async fn create(&self, year: &Year) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Year>>;

    async fn get_by_value(&self, year: i64) -> Result<Option<Year>>;

    /// Oldest year first
    async fn list(&self) -> Result<Vec<Year>>;

    async fn update(&self, year: &Year) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

const YEAR_COLUMNS: &str = "id, year, vi_content, jp_content, created_at, updated_at";

pub struct SqlxYearRepository {
    pool: DynDatabasePool,
}

impl SqlxYearRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn YearRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl YearRepository for SqlxYearRepository {
    async fn create(&self, year: &Year) -> Result<()> {
        let sql = format!("INSERT INTO years ({}) VALUES (?, ?, ?, ?, ?, ?)", YEAR_COLUMNS);
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&year.id)
                .bind(year.year)
                .bind(&year.vi_content)
                .bind(&year.jp_content)
                .bind(year.created_at)
                .bind(year.updated_at)
                .execute(conn)
                .await
                .context("Failed to create year")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Year>> {
        let sql = format!("SELECT {} FROM years WHERE id = ?", YEAR_COLUMNS);
        let year = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Year>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get year")?
        });
        Ok(year)
    }

    async fn get_by_value(&self, value: i64) -> Result<Option<Year>> {
        let sql = format!("SELECT {} FROM years WHERE year = ?", YEAR_COLUMNS);
        let year = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Year>(&sql)
                .bind(value)
                .fetch_optional(conn)
                .await
                .context("Failed to get year by value")?
        });
        Ok(year)
    }

    async fn list(&self) -> Result<Vec<Year>> {
        let sql = format!("SELECT {} FROM years ORDER BY year", YEAR_COLUMNS);
        let years = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Year>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list years")?
        });
        Ok(years)
    }

    async fn update(&self, year: &Year) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE years SET year = ?, vi_content = ?, jp_content = ?, updated_at = ? WHERE id = ?")
                .bind(year.year)
                .bind(&year.vi_content)
                .bind(&year.jp_content)
                .bind(year.updated_at)
                .bind(&year.id)
                .execute(conn)
                .await
                .context("Failed to update year")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM years WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete year")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    fn year(value: i64) -> Year {
        let now = Utc::now();
        Year {
            id: uuid::Uuid::new_v4().to_string(),
            year: value,
            vi_content: format!("Năm {}", value),
            jp_content: format!("{}年", value),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_years_sorted_and_unique() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxYearRepository::new(pool);

        repo.create(&year(2020)).await.unwrap();
        repo.create(&year(2015)).await.unwrap();
        assert!(repo.create(&year(2020)).await.is_err());

        let values: Vec<i64> = repo.list().await.unwrap().iter().map(|y| y.year).collect();
        assert_eq!(values, vec![2015, 2020]);

        let found = repo.get_by_value(2015).await.unwrap().unwrap();
        assert!(repo.delete(&found.id).await.unwrap());
        assert!(repo.get_by_value(2015).await.unwrap().is_none());
    }
}
