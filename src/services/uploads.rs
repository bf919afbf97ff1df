use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::errors::AppError;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];
const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn validate(&self, max_bytes: usize) -> Result<(), AppError> {
        if self.bytes.len() > max_bytes {
            return Err(AppError::UploadTooLarge(format!(
                "{} is {} bytes, limit is {max_bytes}",
                self.file_name,
                self.bytes.len()
            )));
        }

        let content_type = self.content_type.to_ascii_lowercase();
        let type_ok = ALLOWED_CONTENT_TYPES.contains(&content_type.as_str());
        let ext_ok = self
            .extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);

        if !(type_ok && ext_ok) {
            return Err(AppError::Upload(format!(
                "{} is not an image (jpeg, png or gif)",
                self.file_name
            )));
        }
        Ok(())
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub async fn store(&self, dir: &Path) -> Result<String, AppError> {
        let ext = self.extension().unwrap_or_else(|| "bin".to_string());
        let name = format!(
            "{}-{}.{ext}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        );

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create upload dir: {e}")))?;
        tokio::fs::write(dir.join(&name), &self.bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to write {name}: {e}")))?;

        Ok(name)
    }
}

pub async fn remove_photos(dir: &Path, names: &[String]) {
    for name in names {
        let path: PathBuf = dir.join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove orphaned photo");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(name: &str, content_type: &str, len: usize) -> PhotoUpload {
        PhotoUpload {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_accepts_common_raster_images() {
        assert!(photo("lawn.jpg", "image/jpeg", 10).validate(100).is_ok());
        assert!(photo("LAWN.PNG", "image/png", 10).validate(100).is_ok());
        assert!(photo("yard.gif", "image/gif", 100).validate(100).is_ok());
    }

    #[test]
    fn test_rejects_wrong_type_or_extension() {
        assert!(matches!(
            photo("notes.pdf", "application/pdf", 10).validate(100),
            Err(AppError::Upload(_))
        ));
        // extension and content type must both agree
        assert!(matches!(
            photo("lawn.jpg", "text/plain", 10).validate(100),
            Err(AppError::Upload(_))
        ));
        assert!(matches!(
            photo("lawn", "image/png", 10).validate(100),
            Err(AppError::Upload(_))
        ));
    }

    #[test]
    fn test_rejects_oversize() {
        assert!(matches!(
            photo("lawn.jpg", "image/jpeg", 101).validate(100),
            Err(AppError::UploadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let dir = std::env::temp_dir().join(format!("lawnbook-upload-{}", uuid::Uuid::new_v4()));
        let name = photo("lawn.JPG", "image/jpeg", 16).store(&dir).await.unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(std::fs::read(dir.join(&name)).unwrap().len(), 16);

        remove_photos(&dir, &[name.clone()]).await;
        assert!(!dir.join(&name).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
