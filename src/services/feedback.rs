//! Customer feedback (testimonials) service

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::FeedbackRepository;
use crate::models::{Feedback, FeedbackInput, UpdateFeedbackInput};
use crate::services::error::{required, required_if_present, ServiceError};
use crate::services::media::{MediaFolder, MediaStore, UploadedFile};

pub struct FeedbackService {
    repo: Arc<dyn FeedbackRepository>,
    media: Arc<MediaStore>,
}

impl FeedbackService {
    pub fn new(repo: Arc<dyn FeedbackRepository>, media: Arc<MediaStore>) -> Self {
        Self { repo, media }
    }

    pub async fn list(&self) -> Result<Vec<Feedback>, ServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list feedback")
            .map_err(Into::into)
    }

    pub async fn get(&self, id: &str) -> Result<Feedback, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get feedback")?
            .ok_or_else(|| ServiceError::not_found("Feedback not found"))
    }

    /// The avatar is optional.
    pub async fn create(
        &self,
        input: FeedbackInput,
        avatar: Option<UploadedFile>,
    ) -> Result<Feedback, ServiceError> {
        let name = required("name", &input.name)?;
        let vi_position = required("viPosition", &input.vi_position)?;
        let jp_position = required("jpPosition", &input.jp_position)?;
        let vi_content = required("viContent", &input.vi_content)?;
        let jp_content = required("jpContent", &input.jp_content)?;
        let avatar = match avatar {
            Some(file) => Some(
                self.media
                    .save_image(MediaFolder::Feedback, "avatar", &file)
                    .await?,
            ),
            None => None,
        };

        let now = chrono::Utc::now();
        let feedback = Feedback {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            vi_position,
            jp_position,
            vi_content,
            jp_content,
            avatar,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.repo.create(&feedback).await {
            self.media.remove_all(feedback.avatar.iter()).await;
            return Err(e.context("Failed to create feedback").into());
        }
        Ok(feedback)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateFeedbackInput,
        avatar: Option<UploadedFile>,
    ) -> Result<Feedback, ServiceError> {
        let mut feedback = self.get(id).await?;

        let fields = [
            ("name", input.name, &mut feedback.name),
            ("viPosition", input.vi_position, &mut feedback.vi_position),
            ("jpPosition", input.jp_position, &mut feedback.jp_position),
            ("viContent", input.vi_content, &mut feedback.vi_content),
            ("jpContent", input.jp_content, &mut feedback.jp_content),
        ];
        for (name, value, target) in fields {
            if let Some(v) = required_if_present(name, value.as_deref())? {
                *target = v;
            }
        }

        let replaced = match avatar {
            Some(file) => {
                let path = self
                    .media
                    .save_image(MediaFolder::Feedback, "avatar", &file)
                    .await?;
                feedback.avatar.replace(path)
            }
            None => None,
        };
        feedback.updated_at = chrono::Utc::now();

        if let Err(e) = self.repo.update(&feedback).await {
            if replaced.is_some() {
                self.media.remove_all(feedback.avatar.iter()).await;
            }
            return Err(e.context("Failed to update feedback").into());
        }
        self.media.remove_all(replaced.iter()).await;
        Ok(feedback)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let feedback = self.get(id).await?;
        if !self.repo.delete(id).await.context("Failed to delete feedback")? {
            return Err(ServiceError::not_found("Feedback not found"));
        }
        self.media.remove_all(feedback.avatar.iter()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::SqlxFeedbackRepository;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_feedback_without_avatar() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            ..UploadConfig::default()
        }));
        let service = FeedbackService::new(SqlxFeedbackRepository::boxed(pool), media);

        let feedback = service
            .create(
                FeedbackInput {
                    name: "Sato".to_string(),
                    vi_position: "Đối tác".to_string(),
                    jp_position: "パートナー".to_string(),
                    vi_content: "Rất hài lòng".to_string(),
                    jp_content: "大変満足".to_string(),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(feedback.avatar, None);

        let avatar = UploadedFile {
            file_name: "sato.gif".to_string(),
            content_type: "image/gif".to_string(),
            data: b"GIF89a".to_vec(),
        };
        let updated = service
            .update(&feedback.id, UpdateFeedbackInput::default(), Some(avatar))
            .await
            .unwrap();
        assert!(updated.avatar.as_deref().unwrap().starts_with("uploads/feedback/"));

        service.delete(&feedback.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }
}
