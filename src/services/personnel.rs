//! Personnel service

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::PersonnelRepository;
use crate::models::{Personnel, PersonnelInput, UpdatePersonnelInput};
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaStore, UploadedFile};

pub struct PersonnelService {
    repo: Arc<dyn PersonnelRepository>,
    media: Arc<MediaStore>,
}

impl PersonnelService {
    pub fn new(repo: Arc<dyn PersonnelRepository>, media: Arc<MediaStore>) -> Self {
        Self { repo, media }
    }

    /// Everyone, in display order
    pub async fn list(&self) -> Result<Vec<Personnel>, ServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list personnel")
            .map_err(Into::into)
    }

    pub async fn get(&self, id: &str) -> Result<Personnel, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get personnel")?
            .ok_or_else(|| ServiceError::not_found("Personnel not found"))
    }

    pub async fn create(
        &self,
        input: PersonnelInput,
        image: Option<UploadedFile>,
    ) -> Result<Personnel, ServiceError> {
        let vi_name = required("viName", &input.vi_name)?;
        let jp_name = required("jpName", &input.jp_name)?;
        let vi_position = required("viPosition", &input.vi_position)?;
        let jp_position = required("jpPosition", &input.jp_position)?;
        let image = image.ok_or_else(|| ServiceError::bad_request("image is required"))?;
        let image = self
            .media
            .save_image(MediaFolder::Personnel, "image", &image)
            .await?;

        let now = chrono::Utc::now();
        let personnel = Personnel {
            id: uuid::Uuid::new_v4().to_string(),
            vi_name,
            jp_name,
            vi_position,
            jp_position,
            image,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.repo.create(&personnel).await {
            self.media.remove(&personnel.image).await;
            return Err(e.context("Failed to create personnel").into());
        }
        Ok(personnel)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdatePersonnelInput,
        image: Option<UploadedFile>,
    ) -> Result<Personnel, ServiceError> {
        let mut personnel = self.get(id).await?;

        if let Some(v) = required_if_present("viName", input.vi_name.as_deref())? {
            personnel.vi_name = v;
        }
        if let Some(v) = required_if_present("jpName", input.jp_name.as_deref())? {
            personnel.jp_name = v;
        }
        if let Some(v) = required_if_present("viPosition", input.vi_position.as_deref())? {
            personnel.vi_position = v;
        }
        if let Some(v) = required_if_present("jpPosition", input.jp_position.as_deref())? {
            personnel.jp_position = v;
        }
        if let Some(order) = input.sort_order {
            personnel.sort_order = order;
        }

        let replaced = match image {
            Some(file) => {
                let path = self
                    .media
                    .save_image(MediaFolder::Personnel, "image", &file)
                    .await?;
                Some(std::mem::replace(&mut personnel.image, path))
            }
            None => None,
        };
        personnel.updated_at = chrono::Utc::now();

        if let Err(e) = self.repo.update(&personnel).await {
            if replaced.is_some() {
                self.media.remove(&personnel.image).await;
            }
            return Err(e.context("Failed to update personnel").into());
        }
        self.media.remove_all(replaced.iter()).await;
        Ok(personnel)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let personnel = self.get(id).await?;
        if !self.repo.delete(id).await.context("Failed to delete personnel")? {
            return Err(ServiceError::not_found("Personnel not found"));
        }
        self.media.remove(&personnel.image).await;
        Ok(())
    }
}
