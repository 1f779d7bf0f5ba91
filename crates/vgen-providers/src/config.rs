//! Provider configuration.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, ProviderResult};

/// fal.ai queue API settings.
#[derive(Debug, Clone)]
pub struct FalConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model path, e.g. `fal-ai/kling-video/v1.6/standard/image-to-video`
    pub model: String,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://queue.fal.run".to_string(),
            model: "fal-ai/kling-video/v1.6/standard/image-to-video".to_string(),
        }
    }
}

/// Replicate predictions API settings.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    /// Model version, either a bare hash or `owner/model:hash`
    pub version: String,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: "https://api.replicate.com".to_string(),
            version: "stability-ai/stable-video-diffusion:3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438".to_string(),
        }
    }
}

/// OpenAI speech endpoint settings.
#[derive(Debug, Clone)]
pub struct OpenAiTtsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice: String,
}

impl Default for OpenAiTtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }
}

/// Settings for every shipped provider.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub fal: FalConfig,
    pub replicate: ReplicateConfig,
    pub openai_tts: OpenAiTtsConfig,
    /// Per-request HTTP timeout for vendor calls
    pub http_timeout: Duration,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            fal: FalConfig::default(),
            replicate: ReplicateConfig::default(),
            openai_tts: OpenAiTtsConfig::default(),
            http_timeout: Duration::from_secs(60),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ProvidersConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fal = FalConfig {
            api_key: non_empty_env("FAL_API_KEY"),
            base_url: non_empty_env("FAL_BASE_URL").unwrap_or(defaults.fal.base_url),
            model: non_empty_env("FAL_VIDEO_MODEL").unwrap_or(defaults.fal.model),
        };

        let replicate = ReplicateConfig {
            api_token: non_empty_env("REPLICATE_API_TOKEN"),
            base_url: non_empty_env("REPLICATE_BASE_URL").unwrap_or(defaults.replicate.base_url),
            version: non_empty_env("REPLICATE_VIDEO_VERSION")
                .unwrap_or(defaults.replicate.version),
        };

        let openai_tts = OpenAiTtsConfig {
            api_key: non_empty_env("OPENAI_API_KEY"),
            base_url: non_empty_env("OPENAI_BASE_URL").unwrap_or(defaults.openai_tts.base_url),
            model: non_empty_env("OPENAI_TTS_MODEL").unwrap_or(defaults.openai_tts.model),
            voice: non_empty_env("OPENAI_TTS_VOICE").unwrap_or(defaults.openai_tts.voice),
        };

        let http_timeout = std::env::var("PROVIDER_HTTP_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        Self {
            fal,
            replicate,
            openai_tts,
            http_timeout,
        }
    }

    /// Shared HTTP client for vendor calls.
    pub fn http_client(&self) -> ProviderResult<Client> {
        Client::builder()
            .timeout(self.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vgen-providers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProviderError::Network)
    }
}

/// Unwrap a credential or fail instantiation.
pub(crate) fn require_credential(value: &Option<String>, env_name: &str) -> ProviderResult<String> {
    value
        .clone()
        .ok_or_else(|| ProviderError::config_error(format!("{} not set", env_name)))
}
