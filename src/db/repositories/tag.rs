//! Tag repository
//!
//! Tags and their association with news entries (`news_tags`).

use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Tag>>;

    /// Tags with the given ids; unknown ids are skipped
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>>;

    /// All tags ordered by Vietnamese name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Whether another tag already uses either name
    async fn name_taken(&self, vi_name: &str, jp_name: &str, exclude_id: Option<&str>) -> Result<bool>;

    async fn update(&self, tag: &Tag) -> Result<()>;

    /// Returns `true` if a tag was removed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Ids of the news entries carrying the tag
    async fn news_ids(&self, tag_id: &str) -> Result<Vec<String>>;
}

pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

/// `?, ?, ?` for an `IN (...)` clause of `n` values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        on_pool!(self.pool, conn => {
            sqlx::query("INSERT INTO tags (id, vi_name, jp_name, created_at) VALUES (?, ?, ?, ?)")
                .bind(&tag.id)
                .bind(&tag.vi_name)
                .bind(&tag.jp_name)
                .bind(tag.created_at)
                .execute(conn)
                .await
                .context("Failed to create tag")?;
        });
        Ok(tag.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Tag>> {
        let tag = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Tag>("SELECT id, vi_name, jp_name, created_at FROM tags WHERE id = ?")
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get tag")?
        });
        Ok(tag)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, vi_name, jp_name, created_at FROM tags WHERE id IN ({}) ORDER BY vi_name",
            placeholders(ids.len())
        );
        let tags = on_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, Tag>(&sql);
            for id in ids {
                query = query.bind(id);
            }
            query.fetch_all(conn).await.context("Failed to get tags by id")?
        });
        Ok(tags)
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let tags = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Tag>("SELECT id, vi_name, jp_name, created_at FROM tags ORDER BY vi_name")
                .fetch_all(conn)
                .await
                .context("Failed to list tags")?
        });
        Ok(tags)
    }

    async fn name_taken(&self, vi_name: &str, jp_name: &str, exclude_id: Option<&str>) -> Result<bool> {
        let count = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM tags WHERE (vi_name = ? OR jp_name = ?) AND id <> ?",
            )
            .bind(vi_name)
            .bind(jp_name)
            .bind(exclude_id.unwrap_or(""))
            .fetch_one(conn)
            .await
            .context("Failed to check tag names")?
        });
        Ok(count > 0)
    }

    async fn update(&self, tag: &Tag) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query("UPDATE tags SET vi_name = ?, jp_name = ? WHERE id = ?")
                .bind(&tag.vi_name)
                .bind(&tag.jp_name)
                .bind(&tag.id)
                .execute(conn)
                .await
                .context("Failed to update tag")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await?;
            sqlx::query("DELETE FROM news_tags WHERE tag_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to detach tag")?;
            let affected = sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete tag")?
                .rows_affected();
            tx.commit().await?;
            affected
        });
        Ok(affected > 0)
    }

    async fn news_ids(&self, tag_id: &str) -> Result<Vec<String>> {
        let ids = on_pool!(self.pool, conn => {
            sqlx::query_scalar::<_, String>("SELECT news_id FROM news_tags WHERE tag_id = ?")
                .bind(tag_id)
                .fetch_all(conn)
                .await
                .context("Failed to list news for tag")?
        });
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxTagRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxTagRepository::new(pool)
    }

    fn create_test_tag(vi: &str, jp: &str) -> Tag {
        Tag::new(vi.to_string(), jp.to_string())
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let repo = setup_test_repo().await;
        let b = repo.create(&create_test_tag("Nông nghiệp", "農業")).await.unwrap();
        let a = repo.create(&create_test_tag("An toàn", "安全")).await.unwrap();

        assert_eq!(repo.get_by_id(&b.id).await.unwrap().unwrap(), b);
        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);

        let some = repo
            .get_by_ids(&[b.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(some, vec![b]);
        assert!(repo.get_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_taken_excludes_self() {
        let repo = setup_test_repo().await;
        let tag = repo.create(&create_test_tag("Tin tức", "ニュース")).await.unwrap();

        assert!(repo.name_taken("Tin tức", "other", None).await.unwrap());
        assert!(repo.name_taken("other", "ニュース", None).await.unwrap());
        assert!(!repo.name_taken("Tin tức", "ニュース", Some(&tag.id)).await.unwrap());
        assert!(!repo.name_taken("x", "y", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut tag = repo.create(&create_test_tag("a", "b")).await.unwrap();
        tag.vi_name = "c".to_string();
        repo.update(&tag).await.unwrap();
        assert_eq!(repo.get_by_id(&tag.id).await.unwrap().unwrap().vi_name, "c");

        assert!(repo.delete(&tag.id).await.unwrap());
        assert!(!repo.delete(&tag.id).await.unwrap());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
