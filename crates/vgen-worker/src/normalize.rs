//! Source image normalization.
//!
//! Providers take either an inline data URI or a remote URL. Scene images
//! arrive as any of the three locator kinds and are converted here.

use std::sync::Arc;

use tokio::fs;
use vgen_models::locator::mime_from_extension;
use vgen_models::MediaLocator;

use crate::error::{WorkerError, WorkerResult};
use crate::upload::MediaUploader;

#[derive(Clone, Default)]
pub struct ImageNormalizer {
    uploader: Option<Arc<dyn MediaUploader>>,
}

impl ImageNormalizer {
    pub fn new(uploader: Option<Arc<dyn MediaUploader>>) -> Self {
        Self { uploader }
    }

    /// Convert `image` into a locator the provider can consume.
    pub async fn normalize(
        &self,
        image: Option<&MediaLocator>,
        accepts_inline: bool,
    ) -> WorkerResult<MediaLocator> {
        let image = image.ok_or_else(|| WorkerError::normalization_failed("scene has no image"))?;

        let inline = match image {
            MediaLocator::Url(_) => return Ok(image.clone()),
            MediaLocator::Inline { .. } => image.clone(),
            MediaLocator::Local(path) => {
                let mime = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(mime_from_extension)
                    .filter(|m| m.starts_with("image/"))
                    .ok_or_else(|| {
                        WorkerError::normalization_failed(format!(
                            "{} is not a supported image",
                            path.display()
                        ))
                    })?;
                let bytes = fs::read(path).await.map_err(|e| {
                    WorkerError::normalization_failed(format!("{}: {}", path.display(), e))
                })?;
                MediaLocator::inline_from_bytes(mime, &bytes)
            }
        };

        if accepts_inline {
            return Ok(inline);
        }

        let uploader = self.uploader.as_ref().ok_or_else(|| {
            WorkerError::normalization_failed("provider needs a URL and no uploader is configured")
        })?;
        let mime_type = inline.mime_type().unwrap_or("application/octet-stream").to_string();
        let bytes = inline
            .decode_bytes()
            .map_err(|e| WorkerError::normalization_failed(e.to_string()))?;
        let url = uploader
            .upload(bytes, &mime_type)
            .await
            .map_err(|e| WorkerError::normalization_failed(format!("upload failed: {}", e)))?;

        Ok(MediaLocator::Url(url))
    }
}
