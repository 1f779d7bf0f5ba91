//! Application state.

use std::sync::Arc;

use tracing::{info, warn};
use vgen_media::{RenderConfig, RenderEngine};
use vgen_providers::{ProviderRegistry, ProvidersConfig};
use vgen_storage::{R2Client, R2Config};
use vgen_worker::{ImageNormalizer, JobRunner, MediaUploader, MotionSettings, R2Uploader, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub runner: JobRunner,
    pub render: Arc<RenderEngine>,
    pub settings: Arc<MotionSettings>,
    pub normalizer: ImageNormalizer,
    /// Present when R2 credentials are configured
    pub uploader: Option<Arc<R2Uploader>>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let worker_config = WorkerConfig::from_env();
        let registry = ProviderRegistry::with_defaults(ProvidersConfig::from_env())?;
        let render = RenderEngine::new(RenderConfig::from_env())?;

        let settings = MotionSettings::load_or_default(worker_config.motion_settings_path.as_deref());

        let uploader = match R2Config::from_env() {
            Ok(r2) => {
                let client = R2Client::new(r2);
                if let Err(e) = client.check_connectivity().await {
                    warn!("R2 connectivity check failed: {}", e);
                }
                info!(bucket = client.bucket(), "R2 storage enabled");
                Some(R2Uploader::new(client, &worker_config))
            }
            Err(e) => {
                warn!("R2 storage disabled, renders stay local: {}", e);
                None
            }
        };

        Ok(Self::with_components(config, registry, render, settings, uploader))
    }

    /// Assemble state from already built parts.
    pub fn with_components(
        config: ApiConfig,
        registry: ProviderRegistry,
        render: RenderEngine,
        settings: MotionSettings,
        uploader: Option<R2Uploader>,
    ) -> Self {
        let uploader = uploader.map(Arc::new);
        let normalizer = ImageNormalizer::new(
            uploader
                .clone()
                .map(|u| u as Arc<dyn MediaUploader>),
        );

        Self {
            config,
            runner: JobRunner::new(Arc::new(registry)),
            render: Arc::new(render),
            settings: Arc::new(settings),
            normalizer,
            uploader,
        }
    }
}
