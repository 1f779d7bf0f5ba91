//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Failed to fetch {track} asset for scene {scene_index}: {message}")]
    AssetFetch {
        scene_index: usize,
        track: &'static str,
        message: String,
    },

    #[error("Render job {job_id} failed: {message}")]
    RenderEncode {
        job_id: String,
        scene_index: Option<usize>,
        message: String,
        stderr_tail: Option<String>,
    },

    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn asset_fetch(scene_index: usize, track: &'static str, message: impl Into<String>) -> Self {
        Self::AssetFetch {
            scene_index,
            track,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Job id of a failed render, when known.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            MediaError::RenderEncode { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Scene the failure was traced to, when known.
    pub fn scene_index(&self) -> Option<usize> {
        match self {
            MediaError::RenderEncode { scene_index, .. } => *scene_index,
            MediaError::AssetFetch { scene_index, .. } => Some(*scene_index),
            _ => None,
        }
    }
}
