//! Content item repository
//!
//! News and agriculture items share one shape and live in per-parent tables;
//! [`ItemTable`] picks which one a repository instance works on.

use crate::db::DynDatabasePool;
use crate::models::ContentItem;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::tag::placeholders;

/// Which parent's items a repository manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTable {
    News,
    Agriculture,
}

impl ItemTable {
    pub fn table(&self) -> &'static str {
        match self {
            ItemTable::News => "news_items",
            ItemTable::Agriculture => "agriculture_items",
        }
    }
}

const ITEM_COLUMNS: &str =
    "id, parent_id, position, vi_content, jp_content, image, created_at, updated_at";

#[async_trait]
pub trait ContentItemRepository: Send + Sync {
    /// Append the item after the parent's current last item.
    ///
    /// The stored item (with its assigned position) is returned.
    async fn append(&self, item: &ContentItem) -> Result<ContentItem>;

    async fn get_by_id(&self, id: &str) -> Result<Option<ContentItem>>;

    /// Items of one parent in order
    async fn list_for_parent(&self, parent_id: &str) -> Result<Vec<ContentItem>>;

    /// `(parent_id, item_id)` pairs for several parents, ordered by position
    async fn ids_for_parents(&self, parent_ids: &[String]) -> Result<Vec<(String, String)>>;

    async fn update(&self, item: &ContentItem) -> Result<()>;

    /// Returns `true` if an item was removed
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub struct SqlxContentItemRepository {
    pool: DynDatabasePool,
    table: ItemTable,
}

impl SqlxContentItemRepository {
    pub fn new(pool: DynDatabasePool, table: ItemTable) -> Self {
        Self { pool, table }
    }

    pub fn boxed(pool: DynDatabasePool, table: ItemTable) -> Arc<dyn ContentItemRepository> {
        Arc::new(Self::new(pool, table))
    }
}

#[async_trait]
impl ContentItemRepository for SqlxContentItemRepository {
    async fn append(&self, item: &ContentItem) -> Result<ContentItem> {
        let table = self.table.table();
        let max_sql = format!("SELECT MAX(position) FROM {} WHERE parent_id = ?", table);
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            table, ITEM_COLUMNS
        );

        let position = on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await?;
            let last: Option<i64> = sqlx::query_scalar(&max_sql)
                .bind(&item.parent_id)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to read last item position")?;
            let position = last.map_or(0, |p| p + 1);
            sqlx::query(&insert_sql)
                .bind(&item.id)
                .bind(&item.parent_id)
                .bind(position)
                .bind(&item.vi_content)
                .bind(&item.jp_content)
                .bind(&item.image)
                .bind(item.created_at)
                .bind(item.updated_at)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert into {}", table))?;
            tx.commit().await?;
            position
        });

        Ok(ContentItem {
            position,
            ..item.clone()
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ContentItem>> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?", ITEM_COLUMNS, self.table.table());
        let item = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, ContentItem>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get item")?
        });
        Ok(item)
    }

    async fn list_for_parent(&self, parent_id: &str) -> Result<Vec<ContentItem>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE parent_id = ? ORDER BY position",
            ITEM_COLUMNS,
            self.table.table()
        );
        let items = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, ContentItem>(&sql)
                .bind(parent_id)
                .fetch_all(conn)
                .await
                .context("Failed to list items")?
        });
        Ok(items)
    }

    async fn ids_for_parents(&self, parent_ids: &[String]) -> Result<Vec<(String, String)>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT parent_id, id FROM {} WHERE parent_id IN ({}) ORDER BY parent_id, position",
            self.table.table(),
            placeholders(parent_ids.len())
        );
        let pairs = on_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, (String, String)>(&sql);
            for id in parent_ids {
                query = query.bind(id);
            }
            query.fetch_all(conn).await.context("Failed to list item ids")?
        });
        Ok(pairs)
    }

    async fn update(&self, item: &ContentItem) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET vi_content = ?, jp_content = ?, image = ?, updated_at = ? WHERE id = ?",
            self.table.table()
        );
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&item.vi_content)
                .bind(&item.jp_content)
                .bind(&item.image)
                .bind(item.updated_at)
                .bind(&item.id)
                .execute(conn)
                .await
                .context("Failed to update item")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table.table());
        let affected = on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete item")?
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

    async fn setup() -> (SqlxContentItemRepository, String) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO agriculture (id, vi_title, jp_title, vi_description, jp_description, image, created_at, updated_at) \
             VALUES ('a1', 't', 't', 'd', 'd', 'img', ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(pool.as_sqlite().unwrap())
        .await
        .unwrap();
        (
            SqlxContentItemRepository::new(pool, ItemTable::Agriculture),
            "a1".to_string(),
        )
    }

    fn item(parent: &str, text: &str) -> ContentItem {
        ContentItem::new(parent.to_string(), text.to_string(), text.to_string(), None)
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_positions() {
        let (repo, parent) = setup().await;

        let first = repo.append(&item(&parent, "one")).await.unwrap();
        let second = repo.append(&item(&parent, "two")).await.unwrap();
        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);

        // Positions are not reused after a delete
        repo.delete(&first.id).await.unwrap();
        let third = repo.append(&item(&parent, "three")).await.unwrap();
        assert_eq!(third.position, 2);

        let items = repo.list_for_parent(&parent).await.unwrap();
        let texts: Vec<_> = items.iter().map(|i| i.vi_content.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_append_to_missing_parent_fails() {
        let (repo, _) = setup().await;
        assert!(repo.append(&item("missing", "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_ids_for_parents() {
        let (repo, parent) = setup().await;
        let mut stored = repo.append(&item(&parent, "one")).await.unwrap();
        let second = repo.append(&item(&parent, "two")).await.unwrap();

        stored.jp_content = "一".to_string();
        stored.image = Some("uploads/agriculture/x.png".to_string());
        repo.update(&stored).await.unwrap();

        let fetched = repo.get_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.jp_content, "一");
        assert_eq!(fetched.image.as_deref(), Some("uploads/agriculture/x.png"));

        let pairs = repo.ids_for_parents(&[parent.clone()]).await.unwrap();
        assert_eq!(
            pairs,
            vec![(parent.clone(), stored.id.clone()), (parent, second.id)]
        );
    }
}
