//! News repository
//!
//! News rows with their tags (`news_tags`) and the ids of their items. Item
//! content itself goes through [`super::ContentItemRepository`].

use crate::db::DynDatabasePool;
use crate::models::{ListParams, News, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::tag::placeholders;

#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Insert the entry and link the given tag ids
    async fn create(&self, news: &News, tag_ids: &[String]) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<News>>;

    /// Newest first; `tag_id` restricts to entries carrying that tag
    async fn list(&self, params: &ListParams, tag_id: Option<&str>) -> Result<(Vec<News>, i64)>;

    /// Update the row; `tag_ids` of `Some` replaces the tag links
    async fn update(&self, news: &News, tag_ids: Option<&[String]>) -> Result<()>;

    /// Remove the entry, its items and its tag links in one transaction.
    ///
    /// Returns the stored paths of the posters and item images the removed
    /// rows referenced, read inside the same transaction, or `None` if there
    /// was no such entry.
    async fn delete_with_items(&self, id: &str) -> Result<Option<Vec<String>>>;
}

#[derive(sqlx::FromRow)]
struct NewsRow {
    id: String,
    vi_title: String,
    jp_title: String,
    vi_description: String,
    jp_description: String,
    vi_poster: String,
    jp_poster: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NewsRow {
    fn into_news(self, tags: Vec<Tag>, items: Vec<String>) -> News {
        News {
            id: self.id,
            vi_title: self.vi_title,
            jp_title: self.jp_title,
            vi_description: self.vi_description,
            jp_description: self.jp_description,
            vi_poster: self.vi_poster,
            jp_poster: self.jp_poster,
            tags,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NewsTagRow {
    news_id: String,
    id: String,
    vi_name: String,
    jp_name: String,
    created_at: DateTime<Utc>,
}

const NEWS_COLUMNS: &str = "n.id, n.vi_title, n.jp_title, n.vi_description, n.jp_description, \
                            n.vi_poster, n.jp_poster, n.created_at, n.updated_at";

pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }

    /// Attach tags and item ids to a batch of rows with two queries.
    async fn hydrate(&self, rows: Vec<NewsRow>) -> Result<Vec<News>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let marks = placeholders(ids.len());
        let tag_sql = format!(
            "SELECT nt.news_id, t.id, t.vi_name, t.jp_name, t.created_at \
             FROM news_tags nt JOIN tags t ON t.id = nt.tag_id \
             WHERE nt.news_id IN ({}) ORDER BY t.vi_name, t.id",
            marks
        );
        let item_sql = format!(
            "SELECT parent_id, id FROM news_items WHERE parent_id IN ({}) ORDER BY parent_id, position",
            marks
        );

        let (tag_rows, item_rows) = on_pool!(self.pool, conn => {
            let mut tag_query = sqlx::query_as::<_, NewsTagRow>(&tag_sql);
            let mut item_query = sqlx::query_as::<_, (String, String)>(&item_sql);
            for id in &ids {
                tag_query = tag_query.bind(id);
                item_query = item_query.bind(id);
            }
            let tags = tag_query.fetch_all(conn).await.context("Failed to load news tags")?;
            let items = item_query.fetch_all(conn).await.context("Failed to load news items")?;
            (tags, items)
        });

        let mut tags: HashMap<String, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.news_id).or_default().push(Tag {
                id: row.id,
                vi_name: row.vi_name,
                jp_name: row.jp_name,
                created_at: row.created_at,
            });
        }
        let mut items: HashMap<String, Vec<String>> = HashMap::new();
        for (parent_id, item_id) in item_rows {
            items.entry(parent_id).or_default().push(item_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let row_tags = tags.remove(&row.id).unwrap_or_default();
                let row_items = items.remove(&row.id).unwrap_or_default();
                row.into_news(row_tags, row_items)
            })
            .collect())
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, news: &News, tag_ids: &[String]) -> Result<()> {
        on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await?;
            sqlx::query(
                "INSERT INTO news (id, vi_title, jp_title, vi_description, jp_description, vi_poster, jp_poster, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&news.id)
            .bind(&news.vi_title)
            .bind(&news.jp_title)
            .bind(&news.vi_description)
            .bind(&news.jp_description)
            .bind(&news.vi_poster)
            .bind(&news.jp_poster)
            .bind(news.created_at)
            .bind(news.updated_at)
            .execute(&mut *tx)
            .await
            .context("Failed to create news")?;
            for tag_id in tag_ids {
                sqlx::query("INSERT INTO news_tags (news_id, tag_id) VALUES (?, ?)")
                    .bind(&news.id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to link news tag")?;
            }
            tx.commit().await?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<News>> {
        let sql = format!("SELECT {} FROM news n WHERE n.id = ?", NEWS_COLUMNS);
        let row = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, NewsRow>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get news")?
        });
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, params: &ListParams, tag_id: Option<&str>) -> Result<(Vec<News>, i64)> {
        let (rows, total) = match tag_id {
            Some(tag_id) => {
                let sql = format!(
                    "SELECT {} FROM news n JOIN news_tags nt ON nt.news_id = n.id \
                     WHERE nt.tag_id = ? ORDER BY n.created_at DESC LIMIT ? OFFSET ?",
                    NEWS_COLUMNS
                );
                on_pool!(self.pool, conn => {
                    let rows = sqlx::query_as::<_, NewsRow>(&sql)
                        .bind(tag_id)
                        .bind(params.limit())
                        .bind(params.offset())
                        .fetch_all(conn)
                        .await
                        .context("Failed to list news by tag")?;
                    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news_tags WHERE tag_id = ?")
                        .bind(tag_id)
                        .fetch_one(conn)
                        .await
                        .context("Failed to count news by tag")?;
                    (rows, total)
                })
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM news n ORDER BY n.created_at DESC LIMIT ? OFFSET ?",
                    NEWS_COLUMNS
                );
                on_pool!(self.pool, conn => {
                    let rows = sqlx::query_as::<_, NewsRow>(&sql)
                        .bind(params.limit())
                        .bind(params.offset())
                        .fetch_all(conn)
                        .await
                        .context("Failed to list news")?;
                    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news")
                        .fetch_one(conn)
                        .await
                        .context("Failed to count news")?;
                    (rows, total)
                })
            }
        };
        Ok((self.hydrate(rows).await?, total))
    }

    async fn update(&self, news: &News, tag_ids: Option<&[String]>) -> Result<()> {
        on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await?;
            sqlx::query(
                "UPDATE news SET vi_title = ?, jp_title = ?, vi_description = ?, jp_description = ?, \
                 vi_poster = ?, jp_poster = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&news.vi_title)
            .bind(&news.jp_title)
            .bind(&news.vi_description)
            .bind(&news.jp_description)
            .bind(&news.vi_poster)
            .bind(&news.jp_poster)
            .bind(news.updated_at)
            .bind(&news.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update news")?;
            if let Some(tag_ids) = tag_ids {
                sqlx::query("DELETE FROM news_tags WHERE news_id = ?")
                    .bind(&news.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to clear news tags")?;
                for tag_id in tag_ids {
                    sqlx::query("INSERT INTO news_tags (news_id, tag_id) VALUES (?, ?)")
                        .bind(&news.id)
                        .bind(tag_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to link news tag")?;
                }
            }
            tx.commit().await?;
        });
        Ok(())
    }

    async fn delete_with_items(&self, id: &str) -> Result<Option<Vec<String>>> {
        on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await?;
            // Write-lock the parent first so no item can be attached until commit
            sqlx::query("UPDATE news SET updated_at = updated_at WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to lock news")?;
            let Some((vi_poster, jp_poster)) =
                sqlx::query_as::<_, (String, String)>("SELECT vi_poster, jp_poster FROM news WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to load news posters")?
            else {
                tx.rollback().await?;
                return Ok(None);
            };
            let images = sqlx::query_scalar::<_, String>(
                "SELECT image FROM news_items WHERE parent_id = ? AND image IS NOT NULL",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to load news item images")?;

            sqlx::query("DELETE FROM news_items WHERE parent_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete news items")?;
            sqlx::query("DELETE FROM news_tags WHERE news_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete news tags")?;
            sqlx::query("DELETE FROM news WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete news")?;
            tx.commit().await?;

            let mut files = vec![vi_poster, jp_poster];
            files.extend(images);
            Ok(Some(files))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ContentItemRepository, ItemTable, SqlxContentItemRepository, SqlxTagRepository,
        TagRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::ContentItem;

    struct Fixture {
        news: SqlxNewsRepository,
        tags: SqlxTagRepository,
        items: SqlxContentItemRepository,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        Fixture {
            news: SqlxNewsRepository::new(pool.clone()),
            tags: SqlxTagRepository::new(pool.clone()),
            items: SqlxContentItemRepository::new(pool, ItemTable::News),
        }
    }

    fn create_test_news(title: &str) -> News {
        let now = Utc::now();
        News {
            id: uuid::Uuid::new_v4().to_string(),
            vi_title: title.to_string(),
            jp_title: title.to_string(),
            vi_description: "mô tả".to_string(),
            jp_description: "説明".to_string(),
            vi_poster: "uploads/news/vi.png".to_string(),
            jp_poster: "uploads/news/jp.png".to_string(),
            tags: Vec::new(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_get_with_tags_and_items() {
        let f = setup().await;
        let tag = f.tags.create(&Tag::new("a".into(), "b".into())).await.unwrap();
        let news = create_test_news("first");
        f.news.create(&news, &[tag.id.clone()]).await.unwrap();

        let item = f
            .items
            .append(&ContentItem::new(news.id.clone(), "x".into(), "y".into(), None))
            .await
            .unwrap();

        let loaded = f.news.get_by_id(&news.id).await.unwrap().unwrap();
        assert_eq!(loaded.tags, vec![tag]);
        assert_eq!(loaded.items, vec![item.id]);
        assert!(f.news.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_tag() {
        let f = setup().await;
        let tag = f.tags.create(&Tag::new("a".into(), "b".into())).await.unwrap();
        let tagged = create_test_news("tagged");
        f.news.create(&tagged, &[tag.id.clone()]).await.unwrap();
        f.news.create(&create_test_news("plain"), &[]).await.unwrap();

        let (all, total) = f.news.list(&ListParams::default(), None).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let (filtered, total) = f.news.list(&ListParams::default(), Some(&tag.id)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(filtered[0].id, tagged.id);
    }

    #[tokio::test]
    async fn test_update_replaces_tags_only_when_given() {
        let f = setup().await;
        let a = f.tags.create(&Tag::new("a".into(), "a".into())).await.unwrap();
        let b = f.tags.create(&Tag::new("b".into(), "b".into())).await.unwrap();
        let mut news = create_test_news("n");
        f.news.create(&news, &[a.id.clone()]).await.unwrap();

        news.vi_title = "changed".to_string();
        f.news.update(&news, None).await.unwrap();
        let loaded = f.news.get_by_id(&news.id).await.unwrap().unwrap();
        assert_eq!(loaded.vi_title, "changed");
        assert_eq!(loaded.tags, vec![a]);

        let replacement = vec![b.id.clone()];
        f.news.update(&news, Some(replacement.as_slice())).await.unwrap();
        let loaded = f.news.get_by_id(&news.id).await.unwrap().unwrap();
        assert_eq!(loaded.tags, vec![b]);
    }

    #[tokio::test]
    async fn test_delete_with_items() {
        let f = setup().await;
        let news = create_test_news("n");
        f.news.create(&news, &[]).await.unwrap();
        f.items
            .append(&ContentItem::new(news.id.clone(), "x".into(), "y".into(), None))
            .await
            .unwrap();
        f.items
            .append(&ContentItem::new(
                news.id.clone(),
                "x".into(),
                "y".into(),
                Some("uploads/news/item.png".to_string()),
            ))
            .await
            .unwrap();

        let files = f.news.delete_with_items(&news.id).await.unwrap().unwrap();
        assert_eq!(
            files,
            vec![
                "uploads/news/vi.png".to_string(),
                "uploads/news/jp.png".to_string(),
                "uploads/news/item.png".to_string(),
            ]
        );
        assert!(f.items.list_for_parent(&news.id).await.unwrap().is_empty());
        assert!(f.news.delete_with_items(&news.id).await.unwrap().is_none());
    }
}
