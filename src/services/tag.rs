//! Tag service
//!
//! Bilingual news tags. Names are trimmed, required, and unique per
//! language. Tags are embedded in the cached news detail documents, so
//! renaming or deleting a tag drops the cached detail of every news entry
//! carrying it.

use anyhow::Context;
use std::sync::Arc;

use crate::cache::{news_key, CacheLayer};
use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagInput};
use crate::services::error::{required, write_error, ServiceError};

const NAME_TAKEN: &str = "A tag with this name already exists";

pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<dyn CacheLayer>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<dyn CacheLayer>) -> Self {
        Self { repo, cache }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, ServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    pub async fn get(&self, id: &str) -> Result<Tag, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| ServiceError::not_found("Tag not found"))
    }

    /// # Errors
    /// - `BadRequest` if either name is blank
    /// - `Conflict` if either name is already used
    pub async fn create(&self, input: TagInput) -> Result<Tag, ServiceError> {
        let (vi_name, jp_name) = self.validate(&input, None).await?;
        let tag = self
            .repo
            .create(&Tag::new(vi_name, jp_name))
            .await
            .map_err(|e| write_error(e, "Failed to create tag", NAME_TAKEN))?;
        tracing::info!(tag_id = %tag.id, "Tag created");
        Ok(tag)
    }

    pub async fn update(&self, id: &str, input: TagInput) -> Result<Tag, ServiceError> {
        let mut tag = self.get(id).await?;
        let (vi_name, jp_name) = self.validate(&input, Some(id)).await?;
        tag.vi_name = vi_name;
        tag.jp_name = jp_name;

        self.repo
            .update(&tag)
            .await
            .map_err(|e| write_error(e, "Failed to update tag", NAME_TAKEN))?;
        self.invalidate_news(id).await?;
        Ok(tag)
    }

    /// Delete a tag and detach it from every news entry.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let news_ids = self
            .repo
            .news_ids(id)
            .await
            .context("Failed to load tagged news")?;

        if !self.repo.delete(id).await.context("Failed to delete tag")? {
            return Err(ServiceError::not_found("Tag not found"));
        }

        for news_id in &news_ids {
            self.drop_detail(news_id).await?;
        }
        tracing::info!(tag_id = %id, detached = news_ids.len(), "Tag deleted");
        Ok(())
    }

    async fn validate(
        &self,
        input: &TagInput,
        exclude_id: Option<&str>,
    ) -> Result<(String, String), ServiceError> {
        let vi_name = required("viName", &input.vi_name)?;
        let jp_name = required("jpName", &input.jp_name)?;

        if self
            .repo
            .name_taken(&vi_name, &jp_name, exclude_id)
            .await
            .context("Failed to check tag names")?
        {
            return Err(ServiceError::conflict(NAME_TAKEN));
        }
        Ok((vi_name, jp_name))
    }

    async fn invalidate_news(&self, tag_id: &str) -> Result<(), ServiceError> {
        let news_ids = self
            .repo
            .news_ids(tag_id)
            .await
            .context("Failed to load tagged news")?;
        for news_id in &news_ids {
            self.drop_detail(news_id).await?;
        }
        Ok(())
    }

    async fn drop_detail(&self, news_id: &str) -> Result<(), ServiceError> {
        self.cache
            .delete(&news_key(news_id))
            .await
            .context("Failed to invalidate news detail")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{NewsRepository, SqlxNewsRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ListParams, News};

    fn tag_input(vi: &str, jp: &str) -> TagInput {
        TagInput {
            vi_name: vi.to_string(),
            jp_name: jp.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_validates_and_rejects_duplicates() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = TagService::new(SqlxTagRepository::boxed(pool), Arc::new(MemoryCache::new()));

        let tag = service.create(tag_input("  Lúa gạo ", "米")).await.unwrap();
        assert_eq!(tag.vi_name, "Lúa gạo");

        assert!(matches!(
            service.create(tag_input("", "米")).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            service.create(tag_input("Khác", "米")).await,
            Err(ServiceError::Conflict(_))
        ));

        // Renaming a tag to its own names is not a conflict
        let renamed = service.update(&tag.id, tag_input("Lúa gạo", "お米")).await.unwrap();
        assert_eq!(renamed.jp_name, "お米");
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_conflict() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = TagService::new(SqlxTagRepository::boxed(pool), Arc::new(MemoryCache::new()));

        let (a, b) = tokio::join!(
            service.create(tag_input("Cà phê", "コーヒー")),
            service.create(tag_input("Cà phê", "コーヒー"))
        );

        assert!(a.is_ok() != b.is_ok());
        assert!(matches!(a.err().or(b.err()), Some(ServiceError::Conflict(_))));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_detaches_and_invalidates() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = Arc::new(MemoryCache::new());
        let news_repo = SqlxNewsRepository::new(pool.clone());
        let service = TagService::new(SqlxTagRepository::boxed(pool), cache.clone());

        let tag = service.create(tag_input("Lúa", "米")).await.unwrap();
        let now = chrono::Utc::now();
        let news = News {
            id: uuid::Uuid::new_v4().to_string(),
            vi_title: "t".to_string(),
            jp_title: "t".to_string(),
            vi_description: "d".to_string(),
            jp_description: "d".to_string(),
            vi_poster: "uploads/news/a.png".to_string(),
            jp_poster: "uploads/news/b.png".to_string(),
            tags: vec![],
            items: vec![],
            created_at: now,
            updated_at: now,
        };
        news_repo.create(&news, &[tag.id.clone()]).await.unwrap();
        cache.set(&news_key(&news.id), "{}", None).await.unwrap();

        service.delete(&tag.id).await.unwrap();

        assert!(cache.get(&news_key(&news.id)).await.unwrap().is_none());
        assert!(news_repo.get_by_id(&news.id).await.unwrap().unwrap().tags.is_empty());
        let (tagged, _) = news_repo
            .list(&ListParams::default(), Some(&tag.id))
            .await
            .unwrap();
        assert!(tagged.is_empty());
        assert!(matches!(service.delete(&tag.id).await, Err(ServiceError::NotFound(_))));
    }
}
