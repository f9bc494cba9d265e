//! Local filesystem implementation of [`MediaStore`].
//! Content-addressable: the SHA-256 of the bytes names the file, with
//! two-level directory sharding, so re-uploading the same image
//! deduplicates for free.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use domains::{AppError, MediaStore, Result};

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/media").
    root: PathBuf,
    /// Public URL prefix (e.g., "/media").
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root, url_prefix: url_prefix.trim_end_matches('/').to_string() }
    }

    /// "ab/cd/abcdef….png" relative to the root.
    fn sharded_id(hash: &str, ext: &str) -> String {
        format!("{}/{}/{hash}.{ext}", &hash[0..2], &hash[2..4])
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Sniffs the payload, writes it under its hash, returns the
    /// relative id stored on the Post. A payload that is not a known
    /// image format is a per-field validation error, not an internal
    /// one.
    async fn save(&self, data: Bytes, content_type: &Mime) -> Result<String> {
        if content_type.type_() != mime::IMAGE {
            return Err(AppError::invalid("image", "not an image upload"));
        }
        let format = image::guess_format(&data)
            .map_err(|_| AppError::invalid("image", "unrecognized image format"))?;
        let ext = format.extensions_str().first().copied().unwrap_or("bin");

        let hash = hex::encode(Sha256::digest(&data));
        let id = Self::sharded_id(&hash, ext);
        let path = self.root.join(&id);

        if fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Internal(format!("media stat: {e}")))?
        {
            debug!(%id, "media already stored, deduplicated");
            return Ok(id);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("media mkdir: {e}")))?;
        }
        fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Internal(format!("media write: {e}")))?;
        debug!(%id, bytes = data.len(), format = ?format, "media stored");
        Ok(id)
    }

    fn url(&self, image_id: &str) -> String {
        format!("{}/{}", self.url_prefix, image_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid 1x1 PNG.
    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49,
        0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06,
        0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44,
        0x41, 0x54, 0x78, 0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D,
        0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42,
        0x60, 0x82,
    ];

    fn store() -> LocalMediaStore {
        let root = std::env::temp_dir().join(format!("media-test-{}", uuid::Uuid::now_v7()));
        LocalMediaStore::new(root, "/media/".into())
    }

    #[tokio::test]
    async fn save_is_content_addressed_and_idempotent() {
        let store = store();
        let a = store
            .save(Bytes::from_static(PNG), &mime::IMAGE_PNG)
            .await
            .unwrap();
        let b = store
            .save(Bytes::from_static(PNG), &mime::IMAGE_PNG)
            .await
            .unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(store.url(&a), format!("/media/{a}"));
    }

    #[tokio::test]
    async fn garbage_bytes_are_a_validation_error() {
        let store = store();
        let err = store
            .save(Bytes::from_static(b"not an image"), &mime::IMAGE_PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));
    }

    #[tokio::test]
    async fn non_image_mime_is_rejected() {
        let store = store();
        let err = store
            .save(Bytes::from_static(PNG), &mime::TEXT_PLAIN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));
    }
}
