//! Object storage seam for payment-proof images.
//!
//! The pipeline only needs `upload`; the concrete backend (local disk here,
//! an object store in production) stays behind the trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
    pub key: String,
}

#[async_trait]
pub trait ProofImageStore: Send + Sync {
    async fn upload(&self, bytes: &[u8], category: &str, content_type: &str)
    -> AppResult<StoredImage>;

    /// Remove a previously stored image, e.g. when the record it was
    /// uploaded for failed to commit.
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// Disk-backed store serving files under a public base path.
pub struct LocalImageStore {
    root: std::path::PathBuf,
    public_base: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<std::path::PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }
}

fn extension_for(content_type: &str) -> AppResult<&'static str> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        other => Err(AppError::BadRequest(format!(
            "unsupported image content type: {other}"
        ))),
    }
}

#[async_trait]
impl ProofImageStore for LocalImageStore {
    async fn upload(
        &self,
        bytes: &[u8],
        category: &str,
        content_type: &str,
    ) -> AppResult<StoredImage> {
        let ext = extension_for(content_type)?;
        let key = format!("{category}/{}.{ext}", Uuid::new_v4());

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(e.into()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let url = format!("{}/{key}", self.public_base.trim_end_matches('/'));
        Ok(StoredImage { url, key })
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        tokio::fs::remove_file(self.root.join(key))
            .await
            .map_err(|e| AppError::Internal(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpg");
        assert_eq!(extension_for("image/png").unwrap(), "png");
        assert_eq!(extension_for("image/webp").unwrap(), "webp");
        assert!(extension_for("image/gif").is_err());
        assert!(extension_for("application/pdf").is_err());
    }

    #[tokio::test]
    async fn upload_writes_file_and_builds_public_url() {
        let dir = std::env::temp_dir().join(format!("proof-store-{}", Uuid::new_v4()));
        let store = LocalImageStore::new(&dir, "/uploads/");

        let stored = store
            .upload(b"fake-jpeg-bytes", "payment-proofs", "image/jpeg")
            .await
            .unwrap();

        assert!(stored.url.starts_with("/uploads/payment-proofs/"));
        assert!(stored.url.ends_with(".jpg"));
        let on_disk = tokio::fs::read(dir.join(&stored.key)).await.unwrap();
        assert_eq!(on_disk, b"fake-jpeg-bytes");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn remove_deletes_the_stored_file() {
        let dir = std::env::temp_dir().join(format!("proof-store-{}", Uuid::new_v4()));
        let store = LocalImageStore::new(&dir, "/uploads");

        let stored = store
            .upload(b"short-lived", "payment-proofs", "image/png")
            .await
            .unwrap();
        assert!(tokio::fs::try_exists(dir.join(&stored.key)).await.unwrap());

        store.remove(&stored.key).await.unwrap();
        assert!(!tokio::fs::try_exists(dir.join(&stored.key)).await.unwrap());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
