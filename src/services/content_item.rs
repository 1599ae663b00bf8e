//! Child items of news and agriculture entries
//!
//! Both parents keep an ordered list of bilingual blocks with an optional
//! image. Every write clears the parent's cached detail payload.

use anyhow::Context;
use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::db::repositories::ContentItemRepository;
use crate::models::{ContentItem, ItemInput, UpdateItemInput};
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaStore, UploadedFile};

pub struct ContentItems {
    repo: Arc<dyn ContentItemRepository>,
    cache: Arc<dyn CacheLayer>,
    media: Arc<MediaStore>,
    folder: MediaFolder,
    cache_key: fn(&str) -> String,
}

impl ContentItems {
    pub fn new(
        repo: Arc<dyn ContentItemRepository>,
        cache: Arc<dyn CacheLayer>,
        media: Arc<MediaStore>,
        folder: MediaFolder,
        cache_key: fn(&str) -> String,
    ) -> Self {
        Self {
            repo,
            cache,
            media,
            folder,
            cache_key,
        }
    }

    pub async fn list(&self, parent_id: &str) -> Result<Vec<ContentItem>, ServiceError> {
        self.repo
            .list_for_parent(parent_id)
            .await
            .context("Failed to list items")
            .map_err(Into::into)
    }

    /// Append an item to an existing parent.
    pub async fn append(
        &self,
        parent_id: &str,
        input: ItemInput,
        image: Option<UploadedFile>,
    ) -> Result<ContentItem, ServiceError> {
        let vi_content = required("viContent", &input.vi_content)?;
        let jp_content = required("jpContent", &input.jp_content)?;

        let image = match image {
            Some(file) => Some(self.media.save_image(self.folder, "image", &file).await?),
            None => None,
        };

        let item = ContentItem::new(parent_id.to_string(), vi_content, jp_content, image);
        let stored = match self.repo.append(&item).await {
            Ok(stored) => stored,
            Err(e) => {
                self.media.remove_all(item.image.iter()).await;
                return Err(e.context("Failed to append item").into());
            }
        };

        self.invalidate(parent_id).await?;
        Ok(stored)
    }

    pub async fn update(
        &self,
        item_id: &str,
        input: UpdateItemInput,
        image: Option<UploadedFile>,
    ) -> Result<ContentItem, ServiceError> {
        let mut item = self.get(item_id).await?;
        let vi_content = required_if_present("viContent", input.vi_content.as_deref())?;
        let jp_content = required_if_present("jpContent", input.jp_content.as_deref())?;

        if let Some(v) = vi_content {
            item.vi_content = v;
        }
        if let Some(v) = jp_content {
            item.jp_content = v;
        }

        let replaced = match image {
            Some(file) => {
                let stored = self.media.save_image(self.folder, "image", &file).await?;
                item.image.replace(stored)
            }
            None => None,
        };
        item.updated_at = chrono::Utc::now();

        if let Err(e) = self.repo.update(&item).await {
            if replaced.is_some() {
                self.media.remove_all(item.image.iter()).await;
            }
            return Err(e.context("Failed to update item").into());
        }

        self.media.remove_all(replaced.iter()).await;
        self.invalidate(&item.parent_id).await?;
        Ok(item)
    }

    pub async fn delete(&self, item_id: &str) -> Result<(), ServiceError> {
        let item = self.get(item_id).await?;
        if !self.repo.delete(item_id).await.context("Failed to delete item")? {
            return Err(ServiceError::not_found("Item not found"));
        }
        self.media.remove_all(item.image.iter()).await;
        self.invalidate(&item.parent_id).await
    }

    pub async fn get(&self, item_id: &str) -> Result<ContentItem, ServiceError> {
        self.repo
            .get_by_id(item_id)
            .await
            .context("Failed to get item")?
            .ok_or_else(|| ServiceError::not_found("Item not found"))
    }

    /// Cached detail payload of `parent_id`; a failed read counts as a miss.
    pub async fn cached_detail(&self, parent_id: &str) -> Option<String> {
        let key = (self.cache_key)(parent_id);
        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %key, "Detail cache hit");
                Some(cached)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "Detail cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Detail cache read failed");
                None
            }
        }
    }

    /// Store a freshly assembled payload without expiry.
    ///
    /// Returns `false` if the write failed.
    pub async fn store_detail(&self, parent_id: &str, payload: &str) -> bool {
        let key = (self.cache_key)(parent_id);
        match self.cache.set(&key, payload, None).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Detail cache write failed");
                false
            }
        }
    }

    /// Drop a stored payload unless it still matches `current`, the document
    /// assembled again after the store (`None` once the parent is gone).
    ///
    /// A write that commits while a reader assembles may invalidate before
    /// the reader stores; the second assembly sees that write.
    pub async fn drop_stale_detail(&self, parent_id: &str, stored: &str, current: Option<&str>) {
        if current == Some(stored) {
            return;
        }
        let key = (self.cache_key)(parent_id);
        match self.cache.delete(&key).await {
            Ok(()) => tracing::debug!(key = %key, "Dropped stale detail payload"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to drop stale detail payload"),
        }
    }

    /// Drop the cached detail payload of `parent_id`.
    pub async fn invalidate(&self, parent_id: &str) -> Result<(), ServiceError> {
        let key = (self.cache_key)(parent_id);
        self.cache
            .delete(&key)
            .await
            .with_context(|| format!("Failed to invalidate {}", key))?;
        tracing::debug!(key = %key, "Detail cache invalidated");
        Ok(())
    }
}
