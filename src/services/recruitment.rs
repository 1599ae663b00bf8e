//! Recruitment applications
//!
//! Applications are not stored in the database. The CV is kept under the
//! recruitment media folder and the application is mailed to the HR inbox
//! with the CV attached.

use std::sync::Arc;

use crate::models::RecruitmentInput;
use crate::services::error::{required, validate_email, ServiceError};
use crate::services::mailer::{Attachment, Mail, Mailer};
use crate::services::media::{MediaFolder, MediaKind, MediaStore, UploadedFile};

pub struct RecruitmentService {
    mailer: Arc<dyn Mailer>,
    media: Arc<MediaStore>,
    hr_inbox: String,
}

impl RecruitmentService {
    pub fn new(mailer: Arc<dyn Mailer>, media: Arc<MediaStore>, hr_inbox: String) -> Self {
        Self {
            mailer,
            media,
            hr_inbox,
        }
    }

    /// Validate the application and forward it to HR.
    ///
    /// Returns the stored CV path, if a CV was sent.
    pub async fn apply(
        &self,
        input: RecruitmentInput,
        cv: Option<UploadedFile>,
    ) -> Result<Option<String>, ServiceError> {
        let name = required("name", &input.name)?;
        let email = validate_email(&input.email)?;
        let phone = required("phone", &input.phone)?;
        let position = required("position", &input.position)?;
        let message = input
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        if let Some(file) = &cv {
            self.media.validate("cv", file, MediaKind::Document)?;
        }
        let stored = match &cv {
            Some(file) => Some(self.media.save(MediaFolder::Recruitment, file).await?),
            None => None,
        };

        let mail = Mail {
            to: self.hr_inbox.clone(),
            subject: format!("Ứng tuyển / 応募: {} - {}", position, name),
            body: format!(
                "Họ tên / 氏名: {}\nEmail: {}\nĐiện thoại / 電話: {}\nVị trí / 職種: {}\n\n{}\n",
                name,
                email,
                phone,
                position,
                message.as_deref().unwrap_or("")
            ),
            attachment: cv.map(|file| Attachment {
                file_name: file.file_name,
                content_type: file.content_type,
                data: file.data,
            }),
        };

        self.mailer.send(mail).await?;
        tracing::info!(position = %position, has_cv = stored.is_some(), "Recruitment application sent");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::services::mailer::RecordingMailer;

    fn setup() -> (RecruitmentService, Arc<RecordingMailer>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            ..UploadConfig::default()
        }));
        let mailer = Arc::new(RecordingMailer::default());
        let service = RecruitmentService::new(mailer.clone(), media, "hr@agrinews.test".to_string());
        (service, mailer, dir)
    }

    fn input() -> RecruitmentInput {
        RecruitmentInput {
            name: "Lê Minh".to_string(),
            email: "minh@example.com".to_string(),
            phone: "0901234567".to_string(),
            position: "Kỹ sư nông nghiệp".to_string(),
            message: Some("Tôi muốn ứng tuyển".to_string()),
        }
    }

    #[tokio::test]
    async fn test_application_is_mailed_with_cv() {
        let (service, mailer, dir) = setup();
        let cv = UploadedFile {
            file_name: "cv minh.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: b"%PDF-1.7".to_vec(),
        };

        let stored = service.apply(input(), Some(cv)).await.unwrap().unwrap();
        assert!(stored.starts_with("uploads/recruitment/"));
        assert!(stored.ends_with("cv_minh.pdf"));
        assert_eq!(std::fs::read_dir(dir.path().join("recruitment")).unwrap().count(), 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "hr@agrinews.test");
        assert!(sent[0].body.contains("0901234567"));
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, "cv minh.pdf");
        assert_eq!(attachment.data, b"%PDF-1.7".to_vec());
    }

    #[tokio::test]
    async fn test_rejects_image_as_cv_and_missing_fields() {
        let (service, mailer, _dir) = setup();
        let photo = UploadedFile {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            data: b"png".to_vec(),
        };
        assert!(matches!(
            service.apply(input(), Some(photo)).await,
            Err(ServiceError::BadRequest(_))
        ));

        let mut missing = input();
        missing.position = " ".to_string();
        assert!(matches!(service.apply(missing, None).await, Err(ServiceError::BadRequest(_))));
        assert!(mailer.sent().is_empty());

        assert_eq!(service.apply(input(), None).await.unwrap(), None);
        assert!(mailer.sent()[0].attachment.is_none());
    }
}
