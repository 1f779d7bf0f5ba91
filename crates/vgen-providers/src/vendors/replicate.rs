//! Replicate predictions adapter (image-to-video).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use vgen_models::{GenerationKind, GenerationRequest, JobId, JobStatus, MediaLocator, StatusReport};

use crate::config::{require_credential, ReplicateConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{raw_shape, require_source, GenerationProvider, PollPolicy};

/// Map Replicate prediction states onto canonical statuses.
pub fn map_replicate_status(status: &str) -> JobStatus {
    match status {
        "starting" => JobStatus::Pending,
        "processing" => JobStatus::Processing,
        "succeeded" => JobStatus::Completed,
        _ => JobStatus::Failed,
    }
}

/// Last `NN%` figure in a prediction's logs.
pub fn extract_progress(logs: &str) -> Option<u8> {
    let re = regex::Regex::new(r"(\d{1,3})%").ok()?;
    re.captures_iter(logs)
        .last()
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .map(|p| p.min(100))
}

/// Output is either a single URL or a list whose first entry is the video.
fn extract_output(prediction: &Value) -> Option<String> {
    match prediction.get("output") {
        Some(Value::String(url)) if !url.is_empty() => Some(url.clone()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .find(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

pub struct ReplicateProvider {
    config: ReplicateConfig,
    api_token: String,
    client: Client,
    policy: PollPolicy,
}

impl ReplicateProvider {
    pub const KEY: &'static str = "replicate";

    pub fn new(config: ReplicateConfig, client: Client) -> ProviderResult<Self> {
        let api_token = require_credential(&config.api_token, "REPLICATE_API_TOKEN")?;
        Ok(Self {
            config,
            api_token,
            client,
            policy: PollPolicy::from_env(Self::KEY, PollPolicy::video_default()),
        })
    }

    fn predictions_url(&self) -> String {
        format!("{}/v1/predictions", self.config.base_url.trim_end_matches('/'))
    }

    /// Version hash; `owner/model:hash` is accepted too.
    fn version(&self) -> &str {
        self.config
            .version
            .rsplit_once(':')
            .map(|(_, hash)| hash)
            .unwrap_or(self.config.version.as_str())
    }

    async fn fetch_prediction(&self, job_id: &JobId) -> ProviderResult<Value> {
        let response = self
            .client
            .get(format!("{}/{}", self.predictions_url(), job_id))
            .bearer_auth(&self.api_token)
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

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GenerationProvider for ReplicateProvider {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn kind(&self) -> GenerationKind {
        GenerationKind::ImageToVideo
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn submit_validated(&self, request: &GenerationRequest) -> ProviderResult<JobId> {
        let source = require_source(self, request)?;

        let mut input = serde_json::json!({
            "image": source.to_string(),
            "prompt": request.instruction_text.trim(),
            "duration": request.duration.seconds(),
            "aspect_ratio": request.aspect_ratio.to_string(),
        });
        if let Some(hint) = request.motion_hint.as_deref() {
            input["motion"] = serde_json::json!(hint);
        }

        debug!(provider = Self::KEY, source = %source.describe(), "Creating prediction");

        let response = self
            .client
            .post(self.predictions_url())
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({
                "version": self.version(),
                "input": input,
            }))
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

        let prediction: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::submit_failed(Self::KEY, e.to_string()))?;

        let id = prediction
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ProviderError::submit_failed(
                    Self::KEY,
                    format!("response has no prediction id: {}", raw_shape(&prediction)),
                )
            })?;

        info!(provider = Self::KEY, job_id = id, "Prediction created");
        Ok(JobId::from_string(id))
    }

    async fn check_status(&self, job_id: &JobId) -> ProviderResult<StatusReport> {
        let prediction = self.fetch_prediction(job_id).await?;
        let raw_status = prediction
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let report = match map_replicate_status(raw_status) {
            JobStatus::Pending => StatusReport::pending(),
            JobStatus::Processing => StatusReport::processing(
                prediction
                    .get("logs")
                    .and_then(|v| v.as_str())
                    .and_then(extract_progress),
            ),
            JobStatus::Completed => StatusReport::completed(),
            JobStatus::Failed => {
                let detail = prediction
                    .get("error")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("prediction ended with status '{}'", raw_status));
                StatusReport::failed(detail)
            }
        };

        Ok(report)
    }

    async fn get_result(&self, job_id: &JobId) -> ProviderResult<MediaLocator> {
        let prediction = self.fetch_prediction(job_id).await?;
        let raw_status = prediction
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if map_replicate_status(raw_status) != JobStatus::Completed {
            return Err(ProviderError::result_unavailable(
                Self::KEY,
                job_id.as_str(),
                format!("prediction status is '{}'", raw_status),
            ));
        }

        match extract_output(&prediction) {
            Some(url) => Ok(MediaLocator::Url(url)),
            None => {
                let raw = raw_shape(&prediction);
                warn!(provider = Self::KEY, job_id = %job_id, raw = %raw, "Prediction succeeded without output");
                Err(ProviderError::malformed(Self::KEY, job_id.as_str(), raw))
            }
        }
    }
}
