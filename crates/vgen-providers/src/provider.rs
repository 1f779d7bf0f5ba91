//! Provider contract.

use std::time::Duration;

use async_trait::async_trait;
use vgen_models::{GenerationKind, GenerationRequest, JobId, MediaLocator, StatusReport};

use crate::error::{ProviderError, ProviderResult};

/// Poll cadence for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status checks
    pub interval: Duration,
    /// Maximum number of status checks before giving up
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Image-to-video: 3s x 120, roughly a six minute ceiling.
    pub const fn video_default() -> Self {
        Self::new(Duration::from_secs(3), 120)
    }

    /// Text-to-speech: 1s x 30.
    pub const fn speech_default() -> Self {
        Self::new(Duration::from_secs(1), 30)
    }

    pub fn for_kind(kind: GenerationKind) -> Self {
        match kind {
            GenerationKind::ImageToVideo => Self::video_default(),
            GenerationKind::TextToSpeech => Self::speech_default(),
        }
    }

    /// Apply `<KEY>_POLL_INTERVAL_MS` / `<KEY>_POLL_MAX_ATTEMPTS` overrides.
    ///
    /// The key is upper-cased with dashes turned into underscores, so
    /// `openai-tts` reads `OPENAI_TTS_POLL_INTERVAL_MS`.
    pub fn from_env(provider_key: &str, default: PollPolicy) -> Self {
        let prefix = provider_key.to_ascii_uppercase().replace('-', "_");

        let interval = std::env::var(format!("{}_POLL_INTERVAL_MS", prefix))
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(default.interval);

        let max_attempts = std::env::var(format!("{}_POLL_MAX_ATTEMPTS", prefix))
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(default.max_attempts);

        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case wall time spent waiting between checks.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// A generation backend (image-to-video, text-to-speech).
///
/// Adapters implement [`submit_validated`](Self::submit_validated); callers
/// use [`submit`](Self::submit), which validates first so an invalid request
/// never reaches the network.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Registry key.
    fn key(&self) -> &str;

    /// What this provider produces.
    fn kind(&self) -> GenerationKind;

    /// Whether inline base64 source images can be sent as-is.
    fn accepts_inline_source(&self) -> bool {
        false
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::for_kind(self.kind())
    }

    /// Validate and submit a request, returning the vendor job id.
    async fn submit(&self, request: &GenerationRequest) -> ProviderResult<JobId> {
        request
            .validate_for(self.kind())
            .map_err(ProviderError::InvalidRequest)?;
        self.submit_validated(request).await
    }

    /// Network submission of an already validated request.
    async fn submit_validated(&self, request: &GenerationRequest) -> ProviderResult<JobId>;

    /// Map the vendor's current job state onto the canonical statuses.
    async fn check_status(&self, job_id: &JobId) -> ProviderResult<StatusReport>;

    /// Fetch the result of a completed job.
    async fn get_result(&self, job_id: &JobId) -> ProviderResult<MediaLocator>;
}

/// Reject source media the vendor cannot consume.
pub(crate) fn require_source<'a>(
    provider: &dyn GenerationProvider,
    request: &'a GenerationRequest,
) -> ProviderResult<&'a MediaLocator> {
    let source = request
        .source_media
        .as_ref()
        .ok_or_else(|| ProviderError::invalid_request("Source media is required"))?;

    match source {
        MediaLocator::Url(_) => Ok(source),
        MediaLocator::Inline { .. } if provider.accepts_inline_source() => Ok(source),
        MediaLocator::Inline { .. } => Err(ProviderError::invalid_request(format!(
            "Provider {} requires a remote URL for source media",
            provider.key()
        ))),
        MediaLocator::Local(path) => Err(ProviderError::invalid_request(format!(
            "Local file {} must be uploaded or inlined before submission",
            path.display()
        ))),
    }
}

/// Truncated raw response body for diagnostics.
pub(crate) fn raw_shape(value: &serde_json::Value) -> String {
    const MAX_RAW: usize = 2048;
    let raw = value.to_string();
    if raw.len() <= MAX_RAW {
        return raw;
    }
    let mut end = MAX_RAW;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        assert_eq!(PollPolicy::video_default().budget(), Duration::from_secs(360));
        assert_eq!(PollPolicy::speech_default().budget(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_env_falls_back_to_default() {
        let policy = PollPolicy::from_env("no-such-provider-xyz", PollPolicy::speech_default());
        assert_eq!(policy, PollPolicy::speech_default());
    }

    #[test]
    fn test_raw_shape_truncates() {
        let value = serde_json::json!({ "logs": "x".repeat(5000) });
        let raw = raw_shape(&value);
        assert!(raw.len() < 2100);
        assert!(raw.ends_with("..."));
    }
}
