//! OpenAI speech adapter (text-to-speech).
//!
//! The speech endpoint is synchronous: submission performs the call and
//! parks the audio under a locally minted job id until `get_result`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use vgen_models::{GenerationKind, GenerationRequest, JobId, MediaLocator, StatusReport};

use crate::config::{require_credential, OpenAiTtsConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{GenerationProvider, PollPolicy};

pub struct OpenAiTtsProvider {
    config: OpenAiTtsConfig,
    api_key: String,
    client: Client,
    policy: PollPolicy,
    results: Mutex<HashMap<String, MediaLocator>>,
}

impl OpenAiTtsProvider {
    pub const KEY: &'static str = "openai-tts";

    pub fn new(config: OpenAiTtsConfig, client: Client) -> ProviderResult<Self> {
        let api_key = require_credential(&config.api_key, "OPENAI_API_KEY")?;
        Ok(Self {
            config,
            api_key,
            client,
            policy: PollPolicy::from_env(Self::KEY, PollPolicy::speech_default()),
            results: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiTtsProvider {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn kind(&self) -> GenerationKind {
        GenerationKind::TextToSpeech
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn submit_validated(&self, request: &GenerationRequest) -> ProviderResult<JobId> {
        let voice = request.voice.as_deref().unwrap_or(self.config.voice.as_str());
        let url = format!(
            "{}/v1/audio/speech",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(provider = Self::KEY, voice, chars = request.instruction_text.len(), "Synthesizing speech");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "input": request.instruction_text.trim(),
                "voice": voice,
                "response_format": "mp3",
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

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::submit_failed(Self::KEY, e.to_string()))?;
        if bytes.is_empty() {
            return Err(ProviderError::submit_failed(Self::KEY, "empty audio response"));
        }

        let job_id = JobId::new();
        self.results
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(
                job_id.to_string(),
                MediaLocator::inline_from_bytes("audio/mpeg", &bytes),
            );

        info!(provider = Self::KEY, job_id = %job_id, bytes = bytes.len(), "Speech synthesized");
        Ok(job_id)
    }

    async fn check_status(&self, job_id: &JobId) -> ProviderResult<StatusReport> {
        let known = self
            .results
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(job_id.as_str());

        Ok(if known {
            StatusReport::completed()
        } else {
            StatusReport::failed(format!("Unknown speech job {}", job_id))
        })
    }

    /// Hands the audio over and forgets it.
    async fn get_result(&self, job_id: &JobId) -> ProviderResult<MediaLocator> {
        self.results
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(job_id.as_str())
            .ok_or_else(|| {
                ProviderError::result_unavailable(Self::KEY, job_id.as_str(), "no stored audio")
            })
    }
}
