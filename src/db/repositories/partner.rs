//! Partner repository

use crate::db::DynDatabasePool;
use crate::models::Partner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    async fn create(&self, partner: &Partner) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Partner>>;

    async fn list(&self) -> Result<Vec<Partner>>;

    async fn update(&self, partner: &Partner) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

const PARTNER_COLUMNS: &str = "id, name, logo, website, created_at, updated_at";

pub struct SqlxPartnerRepository {
    pool: DynDatabasePool,
}

impl SqlxPartnerRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PartnerRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PartnerRepository for SqlxPartnerRepository {
    async fn create(&self, partner: &Partner) -> Result<()> {
        let sql = format!("INSERT INTO partners ({}) VALUES (?, ?, ?, ?, ?, ?)", PARTNER_COLUMNS);
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&partner.id)
                .bind(&partner.name)
                .bind(&partner.logo)
                .bind(&partner.website)
                .bind(partner.created_at)
                .bind(partner.updated_at)
                .execute(conn)
                .await
                .context("Failed to create partner")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Partner>> {
        let sql = format!("SELECT {} FROM partners WHERE id = ?", PARTNER_COLUMNS);
        let partner = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Partner>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get partner")?
        });
        Ok(partner)
    }

    async fn list(&self) -> Result<Vec<Partner>> {
        let sql = format!("SELECT {} FROM partners ORDER BY created_at", PARTNER_COLUMNS);
        let partners = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Partner>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list partners")?
        });
        Ok(partners)
    }

    async fn update(&self, partner: &Partner) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE partners SET name = ?, logo = ?, website = ?, updated_at = ? WHERE id = ?")
                .bind(&partner.name)
                .bind(&partner.logo)
                .bind(&partner.website)
                .bind(partner.updated_at)
                .bind(&partner.id)
                .execute(conn)
                .await
                .context("Failed to update partner")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM partners WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete partner")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}
