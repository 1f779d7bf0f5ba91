//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Capacity of the motion pipeline event channel
    pub event_buffer: usize,
    /// Key prefix for uploaded source images
    pub upload_prefix: String,
    /// Retries after the first failed upload
    pub upload_max_retries: u32,
    /// Base delay for upload backoff
    pub upload_base_delay: Duration,
    /// JSON motion settings; built-in defaults when unset
    pub motion_settings_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            event_buffer: 64,
            upload_prefix: "uploads".to_string(),
            upload_max_retries: 3,
            upload_base_delay: Duration::from_millis(200),
            motion_settings_path: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            event_buffer: std::env::var("PIPELINE_EVENT_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.event_buffer),
            upload_prefix: std::env::var("UPLOAD_PREFIX")
                .ok()
                .map(|s| s.trim_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.upload_prefix),
            upload_max_retries: std::env::var("UPLOAD_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.upload_max_retries),
            upload_base_delay: std::env::var("UPLOAD_RETRY_BASE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.upload_base_delay),
            motion_settings_path: std::env::var("MOTION_SETTINGS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}
