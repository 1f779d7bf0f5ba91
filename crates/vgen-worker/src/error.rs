//! Worker error types.

use thiserror::Error;
use vgen_providers::ProviderError;
use vgen_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Generation {job_id} on {provider} failed: {detail}")]
    GenerationFailed {
        provider: String,
        job_id: String,
        detail: String,
    },

    #[error("Generation {job_id} on {provider} did not finish after {attempts} status checks")]
    GenerationTimeout {
        provider: String,
        job_id: String,
        attempts: u32,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("Could not prepare source image: {0}")]
    NormalizationFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn generation_failed(
        provider: impl Into<String>,
        job_id: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::GenerationFailed {
            provider: provider.into(),
            job_id: job_id.into(),
            detail: detail.into(),
        }
    }

    pub fn normalization_failed(msg: impl Into<String>) -> Self {
        Self::NormalizationFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::UploadFailed(_) => true,
            WorkerError::Storage(e) => e.is_retryable(),
            WorkerError::Provider(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            WorkerError::GenerationFailed { .. } => "generation_failed",
            WorkerError::GenerationTimeout { .. } => "generation_timeout",
            WorkerError::Cancelled => "cancelled",
            WorkerError::SceneNotFound(_) => "scene_not_found",
            WorkerError::NormalizationFailed(_) => "normalization_failed",
            WorkerError::UploadFailed(_) | WorkerError::Storage(_) => "upload_failed",
            WorkerError::ConfigError(_) => "config_error",
            WorkerError::Provider(e) => e.code(),
            WorkerError::Io(_) | WorkerError::Json(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_codes_pass_through() {
        let err = WorkerError::from(ProviderError::unsupported("nope"));
        assert_eq!(err.code(), "unsupported_provider");
        assert_eq!(err.to_string(), "Unsupported provider: nope");
    }

    #[test]
    fn test_retryable() {
        assert!(WorkerError::upload_failed("503").is_retryable());
        assert!(!WorkerError::Cancelled.is_retryable());
        assert!(!WorkerError::generation_failed("fal", "j1", "nsfw").is_retryable());
    }
}
