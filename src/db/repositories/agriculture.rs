//! Agriculture repository

use crate::db::DynDatabasePool;
use crate::models::{Agriculture, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::content_item::{ContentItemRepository, ItemTable, SqlxContentItemRepository};

#[async_trait]
pub trait AgricultureRepository: Send + Sync {
    async fn create(&self, agriculture: &Agriculture) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Agriculture>>;

    /// Newest first
    async fn list(&self, params: &ListParams) -> Result<(Vec<Agriculture>, i64)>;

    async fn update(&self, agriculture: &Agriculture) -> Result<()>;

    /// Remove the entry and its items in one transaction, returning the
    /// image paths they referenced (`None` if there was no entry)
    async fn delete_with_items(&self, id: &str) -> Result<Option<Vec<String>>>;
}

#[derive(sqlx::FromRow)]
struct AgricultureRow {
    id: String,
    vi_title: String,
    jp_title: String,
    vi_description: String,
    jp_description: String,
    image: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgricultureRow {
    fn into_agriculture(self, items: Vec<String>) -> Agriculture {
        Agriculture {
            id: self.id,
            vi_title: self.vi_title,
            jp_title: self.jp_title,
            vi_description: self.vi_description,
            jp_description: self.jp_description,
            image: self.image,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const AGRICULTURE_COLUMNS: &str =
    "id, vi_title, jp_title, vi_description, jp_description, image, created_at, updated_at";

pub struct SqlxAgricultureRepository {
    pool: DynDatabasePool,
    items: SqlxContentItemRepository,
}

impl SqlxAgricultureRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        let items = SqlxContentItemRepository::new(pool.clone(), ItemTable::Agriculture);
        Self { pool, items }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AgricultureRepository> {
        Arc::new(Self::new(pool))
    }

    async fn hydrate(&self, rows: Vec<AgricultureRow>) -> Result<Vec<Agriculture>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut items: HashMap<String, Vec<String>> = HashMap::new();
        for (parent_id, item_id) in self.items.ids_for_parents(&ids).await? {
            items.entry(parent_id).or_default().push(item_id);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let row_items = items.remove(&row.id).unwrap_or_default();
                row.into_agriculture(row_items)
            })
            .collect())
    }
}

#[async_trait]
impl AgricultureRepository for SqlxAgricultureRepository {
    async fn create(&self, agriculture: &Agriculture) -> Result<()> {
        let sql = format!(
            "INSERT INTO agriculture ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            AGRICULTURE_COLUMNS
        );
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&agriculture.id)
                .bind(&agriculture.vi_title)
                .bind(&agriculture.jp_title)
                .bind(&agriculture.vi_description)
                .bind(&agriculture.jp_description)
                .bind(&agriculture.image)
                .bind(agriculture.created_at)
                .bind(agriculture.updated_at)
                .execute(conn)
                .await
                .context("Failed to create agriculture")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Agriculture>> {
        let sql = format!("SELECT {} FROM agriculture WHERE id = ?", AGRICULTURE_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, AgricultureRow>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get agriculture")?
        });
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<Agriculture>, i64)> {
        let sql = format!(
            "SELECT {} FROM agriculture ORDER BY created_at DESC LIMIT ? OFFSET ?",
            AGRICULTURE_COLUMNS
        );
        let (rows, total) = on_pool!(self.pool, conn => {
            let rows = sqlx::query_as::<_, AgricultureRow>(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list agriculture")?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM agriculture")
                .fetch_one(conn)
                .await
                .context("Failed to count agriculture")?;
            (rows, total)
        });
        Ok((self.hydrate(rows).await?, total))
    }

    async fn update(&self, agriculture: &Agriculture) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE agriculture SET vi_title = ?, jp_title = ?, vi_description = ?, \
                 jp_description = ?, image = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&agriculture.vi_title)
            .bind(&agriculture.jp_title)
            .bind(&agriculture.vi_description)
            .bind(&agriculture.jp_description)
            .bind(&agriculture.image)
            .bind(agriculture.updated_at)
            .bind(&agriculture.id)
            .execute(conn)
            .await
            .context("Failed to update agriculture")?;
        });
        Ok(())
    }

    async fn delete_with_items(&self, id: &str) -> Result<Option<Vec<String>>> {
        on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await?;
            sqlx::query("UPDATE agriculture SET updated_at = updated_at WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to lock agriculture")?;
            let Some(image) = sqlx::query_scalar::<_, String>("SELECT image FROM agriculture WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to load agriculture image")?
            else {
                tx.rollback().await?;
                return Ok(None);
            };
            let mut files = vec![image];
            files.extend(
                sqlx::query_scalar::<_, String>(
                    "SELECT image FROM agriculture_items WHERE parent_id = ? AND image IS NOT NULL",
                )
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .context("Failed to load agriculture item images")?,
            );

            sqlx::query("DELETE FROM agriculture_items WHERE parent_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete agriculture items")?;
            sqlx::query("DELETE FROM agriculture WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete agriculture")?;
            tx.commit().await?;
            Ok(Some(files))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ContentItem;

    async fn setup() -> SqlxAgricultureRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxAgricultureRepository::new(pool)
    }

    fn create_test_agriculture(title: &str) -> Agriculture {
        let now = Utc::now();
        Agriculture {
            id: uuid::Uuid::new_v4().to_string(),
            vi_title: title.to_string(),
            jp_title: title.to_string(),
            vi_description: "d".to_string(),
            jp_description: "d".to_string(),
            image: "uploads/agriculture/a.png".to_string(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_crud_with_items() {
        let repo = setup().await;
        let mut agriculture = create_test_agriculture("rice");
        repo.create(&agriculture).await.unwrap();

        let item = repo
            .items
            .append(&ContentItem::new(agriculture.id.clone(), "a".into(), "b".into(), None))
            .await
            .unwrap();

        let loaded = repo.get_by_id(&agriculture.id).await.unwrap().unwrap();
        assert_eq!(loaded.items, vec![item.id.clone()]);

        agriculture.vi_title = "lúa".to_string();
        repo.update(&agriculture).await.unwrap();
        let (page, total) = repo.list(&ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].vi_title, "lúa");

        let files = repo.delete_with_items(&agriculture.id).await.unwrap().unwrap();
        assert_eq!(files, vec![agriculture.image.clone()]);
        assert!(repo.delete_with_items(&agriculture.id).await.unwrap().is_none());
        assert!(repo.items.get_by_id(&item.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&agriculture.id).await.unwrap().is_none());
    }
}
