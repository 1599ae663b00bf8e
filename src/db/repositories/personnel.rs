//! Personnel repository

use crate::db::DynDatabasePool;
use crate::models::Personnel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PersonnelRepository: Send + Sync {
    async fn create(&self, personnel: &Personnel) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Personnel>>;

    /// Everyone, by `sort_order` then creation time
    async fn list(&self) -> Result<Vec<Personnel>>;

    async fn update(&self, personnel: &Personnel) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

const PERSONNEL_COLUMNS: &str =
    "id, vi_name, jp_name, vi_position, jp_position, image, sort_order, created_at, updated_at";

pub struct SqlxPersonnelRepository {
    pool: DynDatabasePool,
}

impl SqlxPersonnelRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PersonnelRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PersonnelRepository for SqlxPersonnelRepository {
    async fn create(&self, personnel: &Personnel) -> Result<()> {
        let sql = format!(
            "INSERT INTO personnel ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            PERSONNEL_COLUMNS
        );
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&personnel.id)
                .bind(&personnel.vi_name)
                .bind(&personnel.jp_name)
                .bind(&personnel.vi_position)
                .bind(&personnel.jp_position)
                .bind(&personnel.image)
                .bind(personnel.sort_order)
                .bind(personnel.created_at)
                .bind(personnel.updated_at)
                .execute(conn)
                .await
                .context("Failed to create personnel")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Personnel>> {
        let sql = format!("SELECT {} FROM personnel WHERE id = ?", PERSONNEL_COLUMNS);
        let personnel = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Personnel>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get personnel")?
        });
        Ok(personnel)
    }

    async fn list(&self) -> Result<Vec<Personnel>> {
        let sql = format!(
            "SELECT {} FROM personnel ORDER BY sort_order, created_at",
            PERSONNEL_COLUMNS
        );
        let personnel = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Personnel>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list personnel")?
        });
        Ok(personnel)
    }

    async fn update(&self, personnel: &Personnel) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE personnel SET vi_name = ?, jp_name = ?, vi_position = ?, jp_position = ?, \
                 image = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&personnel.vi_name)
            .bind(&personnel.jp_name)
            .bind(&personnel.vi_position)
            .bind(&personnel.jp_position)
            .bind(&personnel.image)
            .bind(personnel.sort_order)
            .bind(personnel.updated_at)
            .bind(&personnel.id)
            .execute(conn)
            .await
            .context("Failed to update personnel")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM personnel WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete personnel")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}
