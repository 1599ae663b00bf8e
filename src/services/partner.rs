//! Partner service

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::PartnerRepository;
use crate::models::{Partner, PartnerInput, UpdatePartnerInput};
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaStore, UploadedFile};

pub struct PartnerService {
    repo: Arc<dyn PartnerRepository>,
    media: Arc<MediaStore>,
}

/// Blank websites are stored as absent.
fn normalize_website(website: Option<String>) -> Option<String> {
    website
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
}

impl PartnerService {
    pub fn new(repo: Arc<dyn PartnerRepository>, media: Arc<MediaStore>) -> Self {
        Self { repo, media }
    }

    pub async fn list(&self) -> Result<Vec<Partner>, ServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list partners")
            .map_err(Into::into)
    }

    pub async fn get(&self, id: &str) -> Result<Partner, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get partner")?
            .ok_or_else(|| ServiceError::not_found("Partner not found"))
    }

    pub async fn create(
        &self,
        input: PartnerInput,
        logo: Option<UploadedFile>,
    ) -> Result<Partner, ServiceError> {
        let name = required("name", &input.name)?;
        let logo = logo.ok_or_else(|| ServiceError::bad_request("logo is required"))?;
        let logo = self
            .media
            .save_image(MediaFolder::Partner, "logo", &logo)
            .await?;

        let now = chrono::Utc::now();
        let partner = Partner {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            logo,
            website: normalize_website(input.website),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.repo.create(&partner).await {
            self.media.remove(&partner.logo).await;
            return Err(e.context("Failed to create partner").into());
        }
        Ok(partner)
    }

    /// A `website` of `Some("")` clears the link.
    pub async fn update(
        &self,
        id: &str,
        input: UpdatePartnerInput,
        logo: Option<UploadedFile>,
    ) -> Result<Partner, ServiceError> {
        let mut partner = self.get(id).await?;

        if let Some(name) = required_if_present("name", input.name.as_deref())? {
            partner.name = name;
        }
        if input.website.is_some() {
            partner.website = normalize_website(input.website);
        }

        let replaced = match logo {
            Some(file) => {
                let path = self
                    .media
                    .save_image(MediaFolder::Partner, "logo", &file)
                    .await?;
                Some(std::mem::replace(&mut partner.logo, path))
            }
            None => None,
        };
        partner.updated_at = chrono::Utc::now();

        if let Err(e) = self.repo.update(&partner).await {
            if replaced.is_some() {
                self.media.remove(&partner.logo).await;
            }
            return Err(e.context("Failed to update partner").into());
        }
        self.media.remove_all(replaced.iter()).await;
        Ok(partner)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let partner = self.get(id).await?;
        if !self.repo.delete(id).await.context("Failed to delete partner")? {
            return Err(ServiceError::not_found("Partner not found"));
        }
        self.media.remove(&partner.logo).await;
        Ok(())
    }
}
