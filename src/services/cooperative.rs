//! Cooperative service

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::CooperativeRepository;
use crate::models::{
    Cooperative, CooperativeInput, ListParams, PagedResult, UpdateCooperativeInput,
};
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaStore, UploadedFile};

pub struct CooperativeService {
    repo: Arc<dyn CooperativeRepository>,
    media: Arc<MediaStore>,
}

impl CooperativeService {
    pub fn new(repo: Arc<dyn CooperativeRepository>, media: Arc<MediaStore>) -> Self {
        Self { repo, media }
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Cooperative>, ServiceError> {
        let (items, total) = self
            .repo
            .list(params)
            .await
            .context("Failed to list cooperatives")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get(&self, id: &str) -> Result<Cooperative, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get cooperative")?
            .ok_or_else(|| ServiceError::not_found("Cooperative not found"))
    }

    pub async fn create(
        &self,
        input: CooperativeInput,
        image: Option<UploadedFile>,
    ) -> Result<Cooperative, ServiceError> {
        let vi_name = required("viName", &input.vi_name)?;
        let jp_name = required("jpName", &input.jp_name)?;
        let vi_address = required("viAddress", &input.vi_address)?;
        let jp_address = required("jpAddress", &input.jp_address)?;
        let vi_description = required("viDescription", &input.vi_description)?;
        let jp_description = required("jpDescription", &input.jp_description)?;
        let image = image.ok_or_else(|| ServiceError::bad_request("image is required"))?;
        let image = self
            .media
            .save_image(MediaFolder::Cooperative, "image", &image)
            .await?;

        let now = chrono::Utc::now();
        let cooperative = Cooperative {
            id: uuid::Uuid::new_v4().to_string(),
            vi_name,
            jp_name,
            vi_address,
            jp_address,
            vi_description,
            jp_description,
            image,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.repo.create(&cooperative).await {
            self.media.remove(&cooperative.image).await;
            return Err(e.context("Failed to create cooperative").into());
        }
        Ok(cooperative)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateCooperativeInput,
        image: Option<UploadedFile>,
    ) -> Result<Cooperative, ServiceError> {
        let mut cooperative = self.get(id).await?;

        let fields = [
            ("viName", input.vi_name, &mut cooperative.vi_name),
            ("jpName", input.jp_name, &mut cooperative.jp_name),
            ("viAddress", input.vi_address, &mut cooperative.vi_address),
            ("jpAddress", input.jp_address, &mut cooperative.jp_address),
            ("viDescription", input.vi_description, &mut cooperative.vi_description),
            ("jpDescription", input.jp_description, &mut cooperative.jp_description),
        ];
        for (name, value, target) in fields {
            if let Some(v) = required_if_present(name, value.as_deref())? {
                *target = v;
            }
        }

        let replaced = match image {
            Some(file) => {
                let path = self
                    .media
                    .save_image(MediaFolder::Cooperative, "image", &file)
                    .await?;
                Some(std::mem::replace(&mut cooperative.image, path))
            }
            None => None,
        };
        cooperative.updated_at = chrono::Utc::now();

        if let Err(e) = self.repo.update(&cooperative).await {
            if replaced.is_some() {
                self.media.remove(&cooperative.image).await;
            }
            return Err(e.context("Failed to update cooperative").into());
        }
        self.media.remove_all(replaced.iter()).await;
        Ok(cooperative)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let cooperative = self.get(id).await?;
        if !self.repo.delete(id).await.context("Failed to delete cooperative")? {
            return Err(ServiceError::not_found("Cooperative not found"));
        }
        self.media.remove(&cooperative.image).await;
        Ok(())
    }
}
