//! Provider error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Submission to {provider} failed: {message}")]
    SubmitFailed { provider: String, message: String },

    #[error("Status check on {provider} failed: {message}")]
    StatusCheckFailed { provider: String, message: String },

    #[error("Result for job {job_id} on {provider} is unavailable: {reason}")]
    ResultUnavailable {
        provider: String,
        job_id: String,
        reason: String,
    },

    #[error("Malformed result for job {job_id} on {provider}: missing media locator")]
    MalformedResult {
        provider: String,
        job_id: String,
        raw: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn unsupported(key: impl Into<String>) -> Self {
        Self::UnsupportedProvider(key.into())
    }

    pub fn submit_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubmitFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn status_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StatusCheckFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn result_unavailable(
        provider: impl Into<String>,
        job_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ResultUnavailable {
            provider: provider.into(),
            job_id: job_id.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(
        provider: impl Into<String>,
        job_id: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self::MalformedResult {
            provider: provider.into(),
            job_id: job_id.into(),
            raw: raw.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::StatusCheckFailed { .. }
        )
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::UnsupportedProvider(_) => "unsupported_provider",
            ProviderError::SubmitFailed { .. } => "provider_submit_error",
            ProviderError::StatusCheckFailed { .. } => "provider_status_error",
            ProviderError::ResultUnavailable { .. } => "result_unavailable",
            ProviderError::MalformedResult { .. } => "malformed_result",
            ProviderError::ConfigError(_) => "provider_config_error",
            ProviderError::Network(_) => "provider_network_error",
            ProviderError::Json(_) => "provider_response_error",
        }
    }
}
