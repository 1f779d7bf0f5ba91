//! fal.ai queue adapter (image-to-video).
//!
//! Submit returns a request id plus status/response URLs. Those URLs are
//! kept per job since fal routes status calls by app id, not the full
//! model path.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use vgen_models::{GenerationKind, GenerationRequest, JobId, JobStatus, MediaLocator, StatusReport};

use crate::config::{require_credential, FalConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{raw_shape, require_source, GenerationProvider, PollPolicy};

#[derive(Debug, Clone)]
struct FalEndpoints {
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct FalSubmitResponse {
    request_id: String,
    status_url: Option<String>,
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FalStatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Map the fal queue vocabulary onto canonical statuses.
pub fn map_fal_status(status: &str) -> JobStatus {
    match status {
        "IN_QUEUE" => JobStatus::Pending,
        "IN_PROGRESS" => JobStatus::Processing,
        "COMPLETED" => JobStatus::Completed,
        _ => JobStatus::Failed,
    }
}

pub struct FalProvider {
    config: FalConfig,
    api_key: String,
    client: Client,
    policy: PollPolicy,
    endpoints: Mutex<HashMap<String, FalEndpoints>>,
}

impl FalProvider {
    pub const KEY: &'static str = "fal";

    pub fn new(config: FalConfig, client: Client) -> ProviderResult<Self> {
        let api_key = require_credential(&config.api_key, "FAL_API_KEY")?;
        Ok(Self {
            config,
            api_key,
            client,
            policy: PollPolicy::from_env(Self::KEY, PollPolicy::video_default()),
            endpoints: Mutex::new(HashMap::new()),
        })
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    /// `owner/app` prefix of the model path.
    fn app_id(&self) -> String {
        self.config
            .model
            .split('/')
            .take(2)
            .collect::<Vec<_>>()
            .join("/")
    }

    fn endpoints_for(&self, job_id: &JobId) -> FalEndpoints {
        let cached = self
            .endpoints
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(job_id.as_str())
            .cloned();

        cached.unwrap_or_else(|| {
            let base = format!(
                "{}/{}/requests/{}",
                self.config.base_url.trim_end_matches('/'),
                self.app_id(),
                job_id
            );
            FalEndpoints {
                status_url: format!("{}/status", base),
                response_url: base,
            }
        })
    }

    fn build_prompt(request: &GenerationRequest) -> String {
        match request.motion_hint.as_deref().filter(|h| !h.trim().is_empty()) {
            Some(hint) => format!("{}. Camera: {}", request.instruction_text.trim(), hint.trim()),
            None => request.instruction_text.trim().to_string(),
        }
    }
}

#[async_trait]
impl GenerationProvider for FalProvider {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn kind(&self) -> GenerationKind {
        GenerationKind::ImageToVideo
    }

    fn accepts_inline_source(&self) -> bool {
        true
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn submit_validated(&self, request: &GenerationRequest) -> ProviderResult<JobId> {
        let source = require_source(self, request)?;

        let body = serde_json::json!({
            "prompt": Self::build_prompt(request),
            "image_url": source.to_string(),
            "duration": request.duration.seconds().to_string(),
            "aspect_ratio": request.aspect_ratio.to_string(),
        });

        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        debug!(provider = Self::KEY, url = %url, source = %source.describe(), "Submitting fal request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::submit_failed(Self::KEY, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::submit_failed(
                Self::KEY,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let submitted: FalSubmitResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::submit_failed(Self::KEY, e.to_string()))?;

        let job_id = JobId::from_string(submitted.request_id);
        if let (Some(status_url), Some(response_url)) =
            (submitted.status_url, submitted.response_url)
        {
            self.endpoints
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .insert(
                    job_id.to_string(),
                    FalEndpoints {
                        status_url,
                        response_url,
                    },
                );
        }

        info!(provider = Self::KEY, job_id = %job_id, "fal request queued");
        Ok(job_id)
    }

    async fn check_status(&self, job_id: &JobId) -> ProviderResult<StatusReport> {
        let endpoints = self.endpoints_for(job_id);

        let response = self
            .client
            .get(&endpoints.status_url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::status_failed(
                Self::KEY,
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let body: FalStatusResponse = response.json().await?;
        let report = match map_fal_status(&body.status) {
            JobStatus::Pending => StatusReport::pending(),
            JobStatus::Processing => StatusReport::processing(None),
            JobStatus::Completed => StatusReport::completed(),
            JobStatus::Failed => {
                warn!(provider = Self::KEY, job_id = %job_id, status = %body.status, "Unrecognized or failed fal status");
                self.endpoints
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .remove(job_id.as_str());
                StatusReport::failed(
                    body.error
                        .unwrap_or_else(|| format!("fal reported status {}", body.status)),
                )
            }
        };

        Ok(report)
    }

    async fn get_result(&self, job_id: &JobId) -> ProviderResult<MediaLocator> {
        let endpoints = self.endpoints_for(job_id);

        let response = self
            .client
            .get(&endpoints.response_url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::result_unavailable(
                Self::KEY,
                job_id.as_str(),
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        let body: serde_json::Value = response.json().await?;
        let url = body
            .pointer("/video/url")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());

        match url {
            Some(url) => {
                self.endpoints
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .remove(job_id.as_str());
                Ok(MediaLocator::Url(url.to_string()))
            }
            None => {
                let raw = raw_shape(&body);
                warn!(provider = Self::KEY, job_id = %job_id, raw = %raw, "fal result has no video.url");
                Err(ProviderError::malformed(Self::KEY, job_id.as_str(), raw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_fal_status("IN_QUEUE"), JobStatus::Pending);
        assert_eq!(map_fal_status("IN_PROGRESS"), JobStatus::Processing);
        assert_eq!(map_fal_status("COMPLETED"), JobStatus::Completed);
        assert_eq!(map_fal_status("SOMETHING_NEW"), JobStatus::Failed);
    }

    #[test]
    fn test_fallback_endpoints_use_app_id() {
        let provider = FalProvider::new(
            FalConfig {
                api_key: Some("k".into()),
                base_url: "https://queue.fal.run/".into(),
                model: "fal-ai/kling-video/v1.6/standard/image-to-video".into(),
            },
            Client::new(),
        )
        .unwrap();

        let endpoints = provider.endpoints_for(&JobId::from_string("abc"));
        assert_eq!(
            endpoints.status_url,
            "https://queue.fal.run/fal-ai/kling-video/requests/abc/status"
        );
        assert_eq!(
            endpoints.response_url,
            "https://queue.fal.run/fal-ai/kling-video/requests/abc"
        );
    }

    #[test]
    fn test_prompt_includes_motion_hint() {
        let request = GenerationRequest::image_to_video(
            "fal",
            MediaLocator::Url("https://x.test/a.png".into()),
            "A lighthouse at dusk ",
        )
        .with_motion_hint("slow zoom in");
        assert_eq!(
            FalProvider::build_prompt(&request),
            "A lighthouse at dusk. Camera: slow zoom in"
        );
    }
}
