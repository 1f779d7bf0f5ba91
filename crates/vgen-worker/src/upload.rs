//! Upload collaborator: turns bytes into a fetchable URL.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;
use vgen_models::locator::extension_from_mime;
use vgen_models::JobId;
use vgen_storage::{R2Client, StorageError};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::retry::{retry_async, RetryConfig};

/// Materializes a binary payload as a URL vendors can fetch.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> WorkerResult<String>;
}

/// Uploads to R2 under `<prefix>/<uuid>.<ext>`.
#[derive(Clone)]
pub struct R2Uploader {
    client: R2Client,
    prefix: String,
    retry: RetryConfig,
}

impl R2Uploader {
    pub fn new(client: R2Client, config: &WorkerConfig) -> Self {
        Self {
            client,
            prefix: config.upload_prefix.clone(),
            retry: RetryConfig::new("r2_upload")
                .with_max_retries(config.upload_max_retries)
                .with_base_delay(config.upload_base_delay),
        }
    }

    /// Object key for a new upload of the given type.
    pub fn key_for(&self, mime_type: &str) -> String {
        let ext = extension_from_mime(mime_type).unwrap_or("bin");
        format!("{}/{}.{}", self.prefix, Uuid::new_v4(), ext)
    }

    /// Publish a finished render as `renders/<job_id>.mp4`.
    pub async fn upload_render(&self, path: &Path, job_id: &JobId) -> WorkerResult<String> {
        let key = format!("renders/{}.mp4", job_id);
        retry_async(&self.retry, StorageError::is_retryable, || {
            self.client.upload_file(path, &key, "video/mp4")
        })
        .await?;
        info!(job_id = %job_id, key = %key, "Render uploaded");
        Ok(self.client.object_url(&key).await?)
    }
}

#[async_trait]
impl MediaUploader for R2Uploader {
    async fn upload(&self, bytes: Vec<u8>, mime_type: &str) -> WorkerResult<String> {
        let key = self.key_for(mime_type);
        retry_async(&self.retry, StorageError::is_retryable, || {
            self.client.upload_bytes(bytes.clone(), &key, mime_type)
        })
        .await?;
        info!(key = %key, size = bytes.len(), "Uploaded source media");
        Ok(self.client.object_url(&key).await?)
    }
}
