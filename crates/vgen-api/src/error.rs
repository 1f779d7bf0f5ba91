//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use vgen_media::MediaError;
use vgen_providers::ProviderError;
use vgen_storage::StorageError;
use vgen_worker::{job_id_of, WorkerError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Provider(e) => provider_status(e),
            ApiError::Worker(e) => match e {
                WorkerError::Provider(e) => provider_status(e),
                WorkerError::GenerationFailed { .. }
                | WorkerError::UploadFailed(_)
                | WorkerError::Storage(_) => StatusCode::BAD_GATEWAY,
                WorkerError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                WorkerError::SceneNotFound(_) => StatusCode::NOT_FOUND,
                WorkerError::NormalizationFailed(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Media(MediaError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Provider(e) => e.code(),
            ApiError::Worker(e) => e.code(),
            ApiError::Media(e) => match e {
                MediaError::InvalidRequest(_) => "invalid_request",
                MediaError::Cancelled => "cancelled",
                _ => "render_failed",
            },
            ApiError::Storage(_) => "storage_error",
        }
    }

    fn job_id(&self) -> Option<String> {
        match self {
            ApiError::Worker(e) => job_id_of(e).map(|id| id.to_string()),
            ApiError::Media(e) => e.job_id().map(str::to_string),
            _ => None,
        }
    }

    fn scene_index(&self) -> Option<usize> {
        match self {
            ApiError::Media(e) => e.scene_index(),
            _ => None,
        }
    }
}

fn provider_status(e: &ProviderError) -> StatusCode {
    match e {
        ProviderError::InvalidRequest(_) | ProviderError::UnsupportedProvider(_) => {
            StatusCode::BAD_REQUEST
        }
        ProviderError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_index: Option<usize>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!(code = self.code(), "Request failed: {}", self);
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                "An internal error occurred".to_string()
            } else {
                self.to_string()
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
            job_id: self.job_id(),
            scene_index: self.scene_index(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unsupported = ApiError::from(WorkerError::from(ProviderError::unsupported("nope")));
        assert_eq!(unsupported.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.code(), "unsupported_provider");

        let failed = ApiError::from(WorkerError::generation_failed("fal", "req-9", "nsfw"));
        assert_eq!(failed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(failed.job_id().as_deref(), Some("req-9"));

        let timeout = ApiError::from(WorkerError::GenerationTimeout {
            provider: "fal".to_string(),
            job_id: "req-1".to_string(),
            attempts: 120,
        });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let encode = ApiError::from(MediaError::RenderEncode {
            job_id: "job-1".to_string(),
            scene_index: Some(2),
            message: "encoder exited".to_string(),
            stderr_tail: None,
        });
        assert_eq!(encode.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(encode.code(), "render_failed");
        assert_eq!(encode.job_id().as_deref(), Some("job-1"));
        assert_eq!(encode.scene_index(), Some(2));
    }
}
