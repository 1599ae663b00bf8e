//! News service
//!
//! News entries carry two posters (one per language), tags and an ordered
//! list of items. The assembled detail payload is cached as JSON under
//! [`news_key`] and dropped on every write to the entry or its items.

use anyhow::Context;
use std::sync::Arc;

use crate::cache::{news_key, CacheLayer};
use crate::db::repositories::{ContentItemRepository, NewsRepository, TagRepository};
use crate::models::{
    ContentItem, ItemInput, ListParams, News, NewsInput, PagedResult, UpdateItemInput,
    UpdateNewsInput,
};
use crate::services::content_item::ContentItems;
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaKind, MediaStore, UploadedFile};

/// Posters sent along with a create or update
#[derive(Debug, Default)]
pub struct NewsPosters {
    pub vi_poster: Option<UploadedFile>,
    pub jp_poster: Option<UploadedFile>,
}

pub struct NewsService {
    news: Arc<dyn NewsRepository>,
    tags: Arc<dyn TagRepository>,
    items: ContentItems,
    media: Arc<MediaStore>,
}

impl NewsService {
    pub fn new(
        news: Arc<dyn NewsRepository>,
        items: Arc<dyn ContentItemRepository>,
        tags: Arc<dyn TagRepository>,
        cache: Arc<dyn CacheLayer>,
        media: Arc<MediaStore>,
    ) -> Self {
        let items = ContentItems::new(
            items,
            cache,
            media.clone(),
            MediaFolder::News,
            news_key,
        );
        Self {
            news,
            tags,
            items,
            media,
        }
    }

    /// Newest first, optionally restricted to one tag id.
    pub async fn list(
        &self,
        params: &ListParams,
        tag_id: Option<&str>,
    ) -> Result<PagedResult<News>, ServiceError> {
        let (news, total) = self
            .news
            .list(params, tag_id)
            .await
            .context("Failed to list news")?;
        Ok(PagedResult::new(news, total, params))
    }

    pub async fn get(&self, id: &str) -> Result<News, ServiceError> {
        self.news
            .get_by_id(id)
            .await
            .context("Failed to get news")?
            .ok_or_else(|| ServiceError::not_found("News not found"))
    }

    /// Entry with its items, as the JSON document served to clients.
    ///
    /// A cached document is returned verbatim; otherwise it is assembled,
    /// stored without expiry and returned.
    pub async fn detail_full(&self, id: &str) -> Result<String, ServiceError> {
        if let Some(cached) = self.items.cached_detail(id).await {
            return Ok(cached);
        }

        let payload = self.assemble_detail(id).await?;
        if self.items.store_detail(id, &payload).await {
            let current = self.assemble_detail(id).await.ok();
            self.items
                .drop_stale_detail(id, &payload, current.as_deref())
                .await;
        }
        Ok(payload)
    }

    async fn assemble_detail(&self, id: &str) -> Result<String, ServiceError> {
        let news = self.get(id).await?;
        let items = self.items.list(id).await?;
        serde_json::to_string(&news.with_items(items))
            .context("Failed to serialize news")
            .map_err(Into::into)
    }

    /// Create an entry; both posters are required.
    ///
    /// Nothing is written unless every field and both posters are valid, and
    /// saved posters are removed again if the insert fails.
    pub async fn create(&self, input: NewsInput, posters: NewsPosters) -> Result<News, ServiceError> {
        let vi_title = required("viTitle", &input.vi_title)?;
        let jp_title = required("jpTitle", &input.jp_title)?;
        let vi_description = required("viDescription", &input.vi_description)?;
        let jp_description = required("jpDescription", &input.jp_description)?;

        let (Some(vi_file), Some(jp_file)) = (posters.vi_poster, posters.jp_poster) else {
            return Err(ServiceError::bad_request("viPoster and jpPoster are both required"));
        };
        self.media.validate("viPoster", &vi_file, MediaKind::Image)?;
        self.media.validate("jpPoster", &jp_file, MediaKind::Image)?;

        let tag_ids = self.resolve_tags(&input.tags).await?;

        let vi_poster = self.media.save(MediaFolder::News, &vi_file).await?;
        let jp_poster = match self.media.save(MediaFolder::News, &jp_file).await {
            Ok(path) => path,
            Err(e) => {
                self.media.remove(&vi_poster).await;
                return Err(e);
            }
        };

        let now = chrono::Utc::now();
        let news = News {
            id: uuid::Uuid::new_v4().to_string(),
            vi_title,
            jp_title,
            vi_description,
            jp_description,
            vi_poster,
            jp_poster,
            tags: Vec::new(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.news.create(&news, &tag_ids).await {
            self.media.remove_all([&news.vi_poster, &news.jp_poster]).await;
            return Err(e.context("Failed to create news").into());
        }

        tracing::info!(news_id = %news.id, "News created");
        self.get(&news.id).await
    }

    /// Partial update; replaced posters are removed after the update succeeds.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateNewsInput,
        posters: NewsPosters,
    ) -> Result<News, ServiceError> {
        let mut news = self.get(id).await?;

        let vi_title = required_if_present("viTitle", input.vi_title.as_deref())?;
        let jp_title = required_if_present("jpTitle", input.jp_title.as_deref())?;
        let vi_description = required_if_present("viDescription", input.vi_description.as_deref())?;
        let jp_description = required_if_present("jpDescription", input.jp_description.as_deref())?;
        if let Some(file) = &posters.vi_poster {
            self.media.validate("viPoster", file, MediaKind::Image)?;
        }
        if let Some(file) = &posters.jp_poster {
            self.media.validate("jpPoster", file, MediaKind::Image)?;
        }
        let tag_ids = match &input.tags {
            Some(tags) => Some(self.resolve_tags(tags).await?),
            None => None,
        };

        if let Some(v) = vi_title {
            news.vi_title = v;
        }
        if let Some(v) = jp_title {
            news.jp_title = v;
        }
        if let Some(v) = vi_description {
            news.vi_description = v;
        }
        if let Some(v) = jp_description {
            news.jp_description = v;
        }

        let mut written = Vec::new();
        let mut replaced = Vec::new();
        if let Some(file) = &posters.vi_poster {
            let path = self.media.save(MediaFolder::News, file).await?;
            written.push(path.clone());
            replaced.push(std::mem::replace(&mut news.vi_poster, path));
        }
        if let Some(file) = &posters.jp_poster {
            let path = match self.media.save(MediaFolder::News, file).await {
                Ok(path) => path,
                Err(e) => {
                    self.media.remove_all(&written).await;
                    return Err(e);
                }
            };
            written.push(path.clone());
            replaced.push(std::mem::replace(&mut news.jp_poster, path));
        }
        news.updated_at = chrono::Utc::now();

        if let Err(e) = self.news.update(&news, tag_ids.as_deref()).await {
            self.media.remove_all(&written).await;
            return Err(e.context("Failed to update news").into());
        }

        self.media.remove_all(&replaced).await;
        self.items.invalidate(id).await?;
        self.get(id).await
    }

    /// Remove the entry, its items, every file they reference and the
    /// cached detail.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let files = self
            .news
            .delete_with_items(id)
            .await
            .context("Failed to delete news")?
            .ok_or_else(|| ServiceError::not_found("News not found"))?;

        self.media.remove_all(&files).await;
        self.items.invalidate(id).await?;

        tracing::info!(news_id = %id, files = files.len(), "News deleted");
        Ok(())
    }

    pub async fn add_item(
        &self,
        news_id: &str,
        input: ItemInput,
        image: Option<UploadedFile>,
    ) -> Result<ContentItem, ServiceError> {
        self.get(news_id).await?;
        self.items.append(news_id, input, image).await
    }

    pub async fn update_item(
        &self,
        item_id: &str,
        input: UpdateItemInput,
        image: Option<UploadedFile>,
    ) -> Result<ContentItem, ServiceError> {
        self.items.update(item_id, input, image).await
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<(), ServiceError> {
        self.items.delete(item_id).await
    }

    /// Deduplicate tag ids and make sure each one exists.
    async fn resolve_tags(&self, tag_ids: &[String]) -> Result<Vec<String>, ServiceError> {
        let mut ids: Vec<String> = Vec::with_capacity(tag_ids.len());
        for id in tag_ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        if ids.is_empty() {
            return Ok(ids);
        }

        let found = self.tags.get_by_ids(&ids).await.context("Failed to load tags")?;
        if found.len() != ids.len() {
            return Err(ServiceError::bad_request("Unknown tag"));
        }
        Ok(ids)
    }
}
