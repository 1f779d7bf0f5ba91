//! Render requests and responses.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, MediaLocator};

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

/// One scene of a render. Missing tracks are filled with black frames or silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderScene {
    /// Clip or still image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaLocator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaLocator>,
    pub duration_secs: f64,
}

impl RenderScene {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            video: None,
            audio: None,
            duration_secs,
        }
    }

    pub fn with_video(mut self, video: MediaLocator) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_audio(mut self, audio: MediaLocator) -> Self {
        self.audio = Some(audio);
        self
    }
}

/// Request to compose scenes into one output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRequest {
    pub scenes: Vec<RenderScene>,
    /// SRT or ASS text spanning the whole output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<String>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl RenderRequest {
    pub fn new(scenes: Vec<RenderScene>) -> Self {
        Self {
            scenes,
            subtitles: None,
            width: default_width(),
            height: default_height(),
        }
    }

    pub fn with_subtitles(mut self, subtitles: impl Into<String>) -> Self {
        self.subtitles = Some(subtitles.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.scenes.is_empty() {
            return Err("At least one scene is required".to_string());
        }

        for (index, scene) in self.scenes.iter().enumerate() {
            if !scene.duration_secs.is_finite() || scene.duration_secs <= 0.0 {
                return Err(format!(
                    "Scene {} has invalid duration {}",
                    index, scene.duration_secs
                ));
            }
        }

        if self.width == 0 || self.height == 0 {
            return Err("Width and height must be positive".to_string());
        }
        // yuv420p needs even dimensions
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(format!(
                "Width and height must be even, got {}x{}",
                self.width, self.height
            ));
        }

        Ok(())
    }

    /// Every video and audio locator, in scene order.
    pub fn media(&self) -> impl Iterator<Item = &MediaLocator> {
        self.scenes
            .iter()
            .flat_map(|s| s.video.iter().chain(s.audio.iter()))
    }

    /// Sum of all scene durations.
    pub fn expected_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }
}

/// Result of a successful render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderResponse {
    pub job_id: JobId,
    /// URL of the uploaded output, or the local path when storage is not configured
    pub output: String,
    /// Probed duration of the output, when ffprobe succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub expected_duration_secs: f64,
    /// Per-scene asset problems that were replaced with placeholders
    #[serde(default)]
    pub warnings: Vec<String>,
}
