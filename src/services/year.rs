//! Company timeline years

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::YearRepository;
use crate::models::{UpdateYearInput, Year, YearInput};
use crate::services::error::{required, required_if_present, write_error, ServiceError};

pub struct YearService {
    repo: Arc<dyn YearRepository>,
}

impl YearService {
    pub fn new(repo: Arc<dyn YearRepository>) -> Self {
        Self { repo }
    }

    /// Oldest first
    pub async fn list(&self) -> Result<Vec<Year>, ServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list years")
            .map_err(Into::into)
    }

    pub async fn get(&self, id: &str) -> Result<Year, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get year")?
            .ok_or_else(|| ServiceError::not_found("Year not found"))
    }

    pub async fn create(&self, input: YearInput) -> Result<Year, ServiceError> {
        let vi_content = required("viContent", &input.vi_content)?;
        let jp_content = required("jpContent", &input.jp_content)?;
        self.ensure_available(input.year, None).await?;

        let now = chrono::Utc::now();
        let year = Year {
            id: uuid::Uuid::new_v4().to_string(),
            year: input.year,
            vi_content,
            jp_content,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&year).await.map_err(|e| {
            write_error(e, "Failed to create year", &format!("Year {} already exists", year.year))
        })?;
        Ok(year)
    }

    pub async fn update(&self, id: &str, input: UpdateYearInput) -> Result<Year, ServiceError> {
        let mut year = self.get(id).await?;
        if let Some(value) = input.year {
            self.ensure_available(value, Some(id)).await?;
            year.year = value;
        }
        if let Some(v) = required_if_present("viContent", input.vi_content.as_deref())? {
            year.vi_content = v;
        }
        if let Some(v) = required_if_present("jpContent", input.jp_content.as_deref())? {
            year.jp_content = v;
        }
        year.updated_at = chrono::Utc::now();

        self.repo.update(&year).await.map_err(|e| {
            write_error(e, "Failed to update year", &format!("Year {} already exists", year.year))
        })?;
        Ok(year)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete year")? {
            return Err(ServiceError::not_found("Year not found"));
        }
        Ok(())
    }

    async fn ensure_available(&self, value: i64, exclude_id: Option<&str>) -> Result<(), ServiceError> {
        if !(1900..=9999).contains(&value) {
            return Err(ServiceError::bad_request(format!("Invalid year: {}", value)));
        }
        let existing = self
            .repo
            .get_by_value(value)
            .await
            .context("Failed to check year")?;
        match existing {
            Some(other) if Some(other.id.as_str()) != exclude_id => {
                Err(ServiceError::conflict(format!("Year {} already exists", value)))
            }
            _ => Ok(()),
        }
    }
}
