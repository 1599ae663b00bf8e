//! Agriculture service
//!
//! Same shape as news without tags and with a single image. The assembled
//! detail payload is cached under [`agriculture_key`].

use anyhow::Context;
use std::sync::Arc;

use crate::cache::{agriculture_key, CacheLayer};
use crate::db::repositories::{AgricultureRepository, ContentItemRepository};
use crate::models::{
    Agriculture, AgricultureInput, ContentItem, ItemInput, ListParams, PagedResult,
    UpdateAgricultureInput, UpdateItemInput,
};
use crate::services::content_item::ContentItems;
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaStore, UploadedFile};

pub struct AgricultureService {
    agriculture: Arc<dyn AgricultureRepository>,
    items: ContentItems,
    media: Arc<MediaStore>,
}

impl AgricultureService {
    pub fn new(
        agriculture: Arc<dyn AgricultureRepository>,
        items: Arc<dyn ContentItemRepository>,
        cache: Arc<dyn CacheLayer>,
        media: Arc<MediaStore>,
    ) -> Self {
        let items = ContentItems::new(
            items,
            cache,
            media.clone(),
            MediaFolder::Agriculture,
            agriculture_key,
        );
        Self {
            agriculture,
            items,
            media,
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Agriculture>, ServiceError> {
        let (entries, total) = self
            .agriculture
            .list(params)
            .await
            .context("Failed to list agriculture")?;
        Ok(PagedResult::new(entries, total, params))
    }

    pub async fn get(&self, id: &str) -> Result<Agriculture, ServiceError> {
        self.agriculture
            .get_by_id(id)
            .await
            .context("Failed to get agriculture")?
            .ok_or_else(|| ServiceError::not_found("Agriculture not found"))
    }

    /// Cached JSON detail document, assembled on a miss.
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
        let entry = self.get(id).await?;
        let items = self.items.list(id).await?;
        serde_json::to_string(&entry.with_items(items))
            .context("Failed to serialize agriculture")
            .map_err(Into::into)
    }

    pub async fn create(
        &self,
        input: AgricultureInput,
        image: Option<UploadedFile>,
    ) -> Result<Agriculture, ServiceError> {
        let vi_title = required("viTitle", &input.vi_title)?;
        let jp_title = required("jpTitle", &input.jp_title)?;
        let vi_description = required("viDescription", &input.vi_description)?;
        let jp_description = required("jpDescription", &input.jp_description)?;
        let image = image.ok_or_else(|| ServiceError::bad_request("image is required"))?;

        let image = self
            .media
            .save_image(MediaFolder::Agriculture, "image", &image)
            .await?;

        let now = chrono::Utc::now();
        let entry = Agriculture {
            id: uuid::Uuid::new_v4().to_string(),
            vi_title,
            jp_title,
            vi_description,
            jp_description,
            image,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.agriculture.create(&entry).await {
            self.media.remove(&entry.image).await;
            return Err(e.context("Failed to create agriculture").into());
        }

        tracing::info!(agriculture_id = %entry.id, "Agriculture created");
        Ok(entry)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateAgricultureInput,
        image: Option<UploadedFile>,
    ) -> Result<Agriculture, ServiceError> {
        let mut entry = self.get(id).await?;

        if let Some(v) = required_if_present("viTitle", input.vi_title.as_deref())? {
            entry.vi_title = v;
        }
        if let Some(v) = required_if_present("jpTitle", input.jp_title.as_deref())? {
            entry.jp_title = v;
        }
        if let Some(v) = required_if_present("viDescription", input.vi_description.as_deref())? {
            entry.vi_description = v;
        }
        if let Some(v) = required_if_present("jpDescription", input.jp_description.as_deref())? {
            entry.jp_description = v;
        }

        let replaced = match image {
            Some(file) => {
                let path = self
                    .media
                    .save_image(MediaFolder::Agriculture, "image", &file)
                    .await?;
                Some(std::mem::replace(&mut entry.image, path))
            }
            None => None,
        };
        entry.updated_at = chrono::Utc::now();

        if let Err(e) = self.agriculture.update(&entry).await {
            if replaced.is_some() {
                self.media.remove(&entry.image).await;
            }
            return Err(e.context("Failed to update agriculture").into());
        }

        self.media.remove_all(replaced.iter()).await;
        self.items.invalidate(id).await?;
        Ok(entry)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let files = self
            .agriculture
            .delete_with_items(id)
            .await
            .context("Failed to delete agriculture")?
            .ok_or_else(|| ServiceError::not_found("Agriculture not found"))?;

        self.media.remove_all(&files).await;
        self.items.invalidate(id).await?;

        tracing::info!(agriculture_id = %id, files = files.len(), "Agriculture deleted");
        Ok(())
    }

    pub async fn add_item(
        &self,
        agriculture_id: &str,
        input: ItemInput,
        image: Option<UploadedFile>,
    ) -> Result<ContentItem, ServiceError> {
        self.get(agriculture_id).await?;
        self.items.append(agriculture_id, input, image).await
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::UploadConfig;
    use crate::db::repositories::{ItemTable, SqlxAgricultureRepository, SqlxContentItemRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (AgricultureService, Arc<MemoryCache>, tempfile::TempDir) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(MemoryCache::new());
        let media = Arc::new(MediaStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            ..UploadConfig::default()
        }));
        let service = AgricultureService::new(
            SqlxAgricultureRepository::boxed(pool.clone()),
            SqlxContentItemRepository::boxed(pool, ItemTable::Agriculture),
            cache.clone(),
            media,
        );
        (service, cache, dir)
    }

    fn jpeg() -> UploadedFile {
        UploadedFile {
            file_name: "field.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        }
    }

    fn input() -> AgricultureInput {
        AgricultureInput {
            vi_title: "Cà phê".to_string(),
            jp_title: "コーヒー".to_string(),
            vi_description: "Tây Nguyên".to_string(),
            jp_description: "中部高原".to_string(),
        }
    }

    fn file_count(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path().join("agriculture"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_create_requires_image() {
        let (service, _, dir) = setup().await;
        let result = service.create(input(), None).await;
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
        assert_eq!(file_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_detail_and_cascade_delete() {
        let (service, cache, dir) = setup().await;
        let entry = service.create(input(), Some(jpeg())).await.unwrap();
        for n in 0..2 {
            service
                .add_item(
                    &entry.id,
                    ItemInput {
                        vi_content: format!("vi {}", n),
                        jp_content: format!("jp {}", n),
                    },
                    Some(jpeg()),
                )
                .await
                .unwrap();
        }
        assert_eq!(file_count(&dir), 3);

        let detail: serde_json::Value =
            serde_json::from_str(&service.detail_full(&entry.id).await.unwrap()).unwrap();
        assert_eq!(detail["items"].as_array().unwrap().len(), 2);
        assert_eq!(detail["items"][1]["position"], 1);
        assert!(cache.get(&agriculture_key(&entry.id)).await.unwrap().is_some());

        service.delete(&entry.id).await.unwrap();

        assert_eq!(file_count(&dir), 0);
        assert!(cache.get(&agriculture_key(&entry.id)).await.unwrap().is_none());
        assert!(service.items.list(&entry.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_clears_cache_and_swaps_image() {
        let (service, cache, dir) = setup().await;
        let entry = service.create(input(), Some(jpeg())).await.unwrap();
        service.detail_full(&entry.id).await.unwrap();

        let updated = service
            .update(
                &entry.id,
                UpdateAgricultureInput {
                    vi_title: Some("Hồ tiêu".to_string()),
                    ..UpdateAgricultureInput::default()
                },
                Some(jpeg()),
            )
            .await
            .unwrap();

        assert_eq!(updated.vi_title, "Hồ tiêu");
        assert_ne!(updated.image, entry.image);
        assert_eq!(file_count(&dir), 1);
        assert!(cache.get(&agriculture_key(&entry.id)).await.unwrap().is_none());

        let blank = service
            .update(
                &entry.id,
                UpdateAgricultureInput {
                    jp_title: Some("  ".to_string()),
                    ..UpdateAgricultureInput::default()
                },
                None,
            )
            .await;
        assert!(matches!(blank, Err(ServiceError::BadRequest(_))));
    }
}
