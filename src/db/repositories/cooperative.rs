//! Cooperative repository

use crate::db::DynDatabasePool;
use crate::models::{Cooperative, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait CooperativeRepository: Send + Sync {
    async fn create(&self, cooperative: &Cooperative) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Cooperative>>;

    /// Newest first
    async fn list(&self, params: &ListParams) -> Result<(Vec<Cooperative>, i64)>;

    async fn update(&self, cooperative: &Cooperative) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

const COOPERATIVE_COLUMNS: &str = "id, vi_name, jp_name, vi_address, jp_address, vi_description, \
                                   jp_description, image, created_at, updated_at";

pub struct SqlxCooperativeRepository {
    pool: DynDatabasePool,
}

impl SqlxCooperativeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CooperativeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CooperativeRepository for SqlxCooperativeRepository {
    async fn create(&self, cooperative: &Cooperative) -> Result<()> {
        let sql = format!(
            "INSERT INTO cooperatives ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COOPERATIVE_COLUMNS
        );
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&cooperative.id)
                .bind(&cooperative.vi_name)
                .bind(&cooperative.jp_name)
                .bind(&cooperative.vi_address)
                .bind(&cooperative.jp_address)
                .bind(&cooperative.vi_description)
                .bind(&cooperative.jp_description)
                .bind(&cooperative.image)
                .bind(cooperative.created_at)
                .bind(cooperative.updated_at)
                .execute(conn)
                .await
                .context("Failed to create cooperative")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Cooperative>> {
        let sql = format!("SELECT {} FROM cooperatives WHERE id = ?", COOPERATIVE_COLUMNS);
        let cooperative = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Cooperative>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get cooperative")?
        });
        Ok(cooperative)
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<Cooperative>, i64)> {
        let sql = format!(
            "SELECT {} FROM cooperatives ORDER BY created_at DESC LIMIT ? OFFSET ?",
            COOPERATIVE_COLUMNS
        );
        let page = on_pool!(self.pool, conn => {
            let rows = sqlx::query_as::<_, Cooperative>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list cooperatives")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cooperatives")
                .fetch_one(conn)
                .await
                .context("Failed to count cooperatives")?;
            (rows, total)
        });
        Ok(page)
    }

    async fn update(&self, cooperative: &Cooperative) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE cooperatives SET vi_name = ?, jp_name = ?, vi_address = ?, jp_address = ?, \
                 vi_description = ?, jp_description = ?, image = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&cooperative.vi_name)
            .bind(&cooperative.jp_name)
            .bind(&cooperative.vi_address)
            .bind(&cooperative.jp_address)
            .bind(&cooperative.vi_description)
            .bind(&cooperative.jp_description)
            .bind(&cooperative.image)
            .bind(cooperative.updated_at)
            .bind(&cooperative.id)
            .execute(conn)
            .await
            .context("Failed to update cooperative")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM cooperatives WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete cooperative")?
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

    #[tokio::test]
    async fn test_cooperative_crud_and_paging() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxCooperativeRepository::new(pool);

        let mut ids = Vec::new();
        for i in 0..3 {
            let now = Utc::now();
            let cooperative = Cooperative {
                id: uuid::Uuid::new_v4().to_string(),
                vi_name: format!("HTX {}", i),
                jp_name: format!("組合 {}", i),
                vi_address: "Hà Nội".to_string(),
                jp_address: "ハノイ".to_string(),
                vi_description: "d".to_string(),
                jp_description: "d".to_string(),
                image: "uploads/cooperative/c.png".to_string(),
                created_at: now,
                updated_at: now,
            };
            repo.create(&cooperative).await.unwrap();
            ids.push(cooperative.id);
        }

        let (page, total) = repo.list(&ListParams::new(2, 2)).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);

        let mut first = repo.get_by_id(&ids[0]).await.unwrap().unwrap();
        first.vi_address = "Huế".to_string();
        repo.update(&first).await.unwrap();
        assert_eq!(repo.get_by_id(&ids[0]).await.unwrap().unwrap().vi_address, "Huế");

        assert!(repo.delete(&ids[0]).await.unwrap());
        assert!(!repo.delete(&ids[0]).await.unwrap());
    }
}
