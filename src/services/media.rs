//! Uploaded media on the local filesystem
//!
//! Files live under `<upload root>/<folder>/` and are referenced from the
//! database by the relative path `uploads/<folder>/<file>`, which is also the
//! URL they are served under.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::UploadConfig;
use crate::services::error::ServiceError;

/// Public URL prefix of stored media
pub const MEDIA_PREFIX: &str = "uploads";

/// Sub-directory per content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    News,
    Agriculture,
    Personnel,
    Partner,
    Cooperative,
    Feedback,
    Recruitment,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::News => "news",
            MediaFolder::Agriculture => "agriculture",
            MediaFolder::Personnel => "personnel",
            MediaFolder::Partner => "partner",
            MediaFolder::Cooperative => "cooperative",
            MediaFolder::Feedback => "feedback",
            MediaFolder::Recruitment => "recruitment",
        }
    }
}

/// A file received in a multipart form
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Document,
}

pub struct MediaStore {
    config: UploadConfig,
}

impl MediaStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.path
    }

    /// Check size and MIME type without touching the disk.
    pub fn validate(&self, field: &str, file: &UploadedFile, kind: MediaKind) -> Result<(), ServiceError> {
        if file.data.is_empty() {
            return Err(ServiceError::bad_request(format!("{} is empty", field)));
        }

        if file.data.len() as u64 > self.config.max_file_size {
            return Err(ServiceError::bad_request(format!(
                "{} is too large. Maximum size: {} bytes",
                field, self.config.max_file_size
            )));
        }

        let allowed = match kind {
            MediaKind::Image => self.config.is_type_allowed(&file.content_type),
            MediaKind::Document => self.config.is_document_allowed(&file.content_type),
        };
        if !allowed {
            return Err(ServiceError::bad_request(format!(
                "{} has an unsupported file type: {}",
                field, file.content_type
            )));
        }

        Ok(())
    }

    /// Write `file` into `folder` and return its stored path.
    pub async fn save(&self, folder: MediaFolder, file: &UploadedFile) -> Result<String, ServiceError> {
        let dir = self.config.path.join(folder.as_str());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory: {:?}", dir))?;

        let file_name = stored_file_name(&file.file_name);
        fs::write(dir.join(&file_name), &file.data)
            .await
            .with_context(|| format!("Failed to save upload: {}", file_name))?;

        tracing::debug!(folder = folder.as_str(), file = %file_name, "Stored upload");
        Ok(format!("{}/{}/{}", MEDIA_PREFIX, folder.as_str(), file_name))
    }

    /// Validate then save; used for fields that are required on create.
    pub async fn save_image(
        &self,
        folder: MediaFolder,
        field: &str,
        file: &UploadedFile,
    ) -> Result<String, ServiceError> {
        self.validate(field, file, MediaKind::Image)?;
        self.save(folder, file).await
    }

    /// Delete a stored file.
    ///
    /// A file that is already gone is logged and otherwise ignored, as is any
    /// other removal failure.
    pub async fn remove(&self, stored_path: &str) {
        let Some(path) = self.resolve(stored_path) else {
            tracing::warn!(path = stored_path, "Refusing to remove media outside the upload root");
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = stored_path, "Removed media"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = stored_path, "Media file already removed")
            }
            Err(e) => tracing::warn!(path = stored_path, error = %e, "Failed to remove media"),
        }
    }

    pub async fn remove_all<I, S>(&self, stored_paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in stored_paths {
            self.remove(path.as_ref()).await;
        }
    }

    /// Map `uploads/<folder>/<file>` onto the upload root.
    fn resolve(&self, stored_path: &str) -> Option<PathBuf> {
        let relative = stored_path
            .strip_prefix(MEDIA_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))?;

        let mut path = self.config.path.clone();
        for part in relative.split('/') {
            if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
                return None;
            }
            path.push(part);
        }
        Some(path)
    }
}

/// `admin-<unix millis>-<random>-<sanitized name>`
fn stored_file_name(original: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "admin-{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &random[..8],
        sanitize_file_name(original)
    )
}

/// Keep ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
///
/// Any directory part of the name is dropped and the result never starts
/// with a dot.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(100).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(root: &Path) -> MediaStore {
        MediaStore::new(UploadConfig {
            path: root.to_path_buf(),
            max_file_size: 16,
            ..UploadConfig::default()
        })
    }

    fn png(data: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: "Ảnh bìa.png".to_string(),
            content_type: "image/png".to_string(),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let stored = store.save(MediaFolder::News, &png(b"img")).await.unwrap();
        assert!(stored.starts_with("uploads/news/admin-"));
        assert!(stored.ends_with("_nh_b_a.png"));

        let on_disk = store.resolve(&stored).unwrap();
        assert!(on_disk.starts_with(dir.path()));
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"img");

        store.remove(&stored).await;
        assert!(!on_disk.exists());

        // second removal only warns
        store.remove(&stored).await;
    }

    #[tokio::test]
    async fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert!(store.validate("image", &png(b"ok"), MediaKind::Image).is_ok());
        assert!(store.validate("image", &png(b""), MediaKind::Image).is_err());
        assert!(store.validate("image", &png(&[0u8; 17]), MediaKind::Image).is_err());
        assert!(store.validate("cv", &png(b"ok"), MediaKind::Document).is_err());

        let pdf = UploadedFile {
            file_name: "cv.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: b"%PDF".to_vec(),
        };
        assert!(store.validate("cv", &pdf, MediaKind::Document).is_ok());
        assert!(store.validate("image", &pdf, MediaKind::Image).is_err());
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = store(Path::new("/srv/uploads"));
        assert_eq!(
            store.resolve("uploads/news/a.png"),
            Some(PathBuf::from("/srv/uploads/news/a.png"))
        );
        assert_eq!(store.resolve("uploads/../etc/passwd"), None);
        assert_eq!(store.resolve("/etc/passwd"), None);
        assert_eq!(store.resolve("uploadsx/a.png"), None);
        assert_eq!(store.resolve("uploads//a.png"), None);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report 2024.pdf"), "report_2024.pdf");
        assert_eq!(sanitize_file_name("../../secret.txt"), "secret.txt");
        assert_eq!(sanitize_file_name("C:\\tmp\\cv.docx"), "cv.docx");
        assert_eq!(sanitize_file_name(".htaccess"), "htaccess");
        assert_eq!(sanitize_file_name(""), "file");
    }

    proptest! {
        #[test]
        fn sanitized_names_are_safe(name in "\\PC{0,200}") {
            let clean = sanitize_file_name(&name);
            prop_assert!(!clean.is_empty());
            prop_assert!(clean.len() <= 100);
            prop_assert!(!clean.starts_with('.'));
            prop_assert!(clean.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')));
        }
    }
}
