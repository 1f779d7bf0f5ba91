//! Generation requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{AspectRatio, DurationCategory, MediaLocator};

/// What a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    /// Animate a still image into a short clip.
    ImageToVideo,
    /// Synthesize narration audio from text.
    TextToSpeech,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::ImageToVideo => "image_to_video",
            GenerationKind::TextToSpeech => "text_to_speech",
        }
    }
}

/// A single generation request. Treated as immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRequest {
    /// Source image (image-to-video only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_media: Option<MediaLocator>,
    /// Prompt for video, or the text to speak for TTS
    #[serde(default)]
    pub instruction_text: String,
    /// Camera motion description appended by some vendors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_hint: Option<String>,
    #[serde(default)]
    pub duration: DurationCategory,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Registry key of the provider to use
    pub provider: String,
    /// Voice selector (TTS only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl GenerationRequest {
    /// Create an image-to-video request.
    pub fn image_to_video(
        provider: impl Into<String>,
        source_media: MediaLocator,
        instruction_text: impl Into<String>,
    ) -> Self {
        Self {
            source_media: Some(source_media),
            instruction_text: instruction_text.into(),
            motion_hint: None,
            duration: DurationCategory::default(),
            aspect_ratio: AspectRatio::default(),
            provider: provider.into(),
            voice: None,
        }
    }

    /// Create a text-to-speech request.
    pub fn speech(provider: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_media: None,
            instruction_text: text.into(),
            motion_hint: None,
            duration: DurationCategory::default(),
            aspect_ratio: AspectRatio::default(),
            provider: provider.into(),
            voice: None,
        }
    }

    pub fn with_motion_hint(mut self, hint: impl Into<String>) -> Self {
        self.motion_hint = Some(hint.into());
        self
    }

    pub fn with_duration(mut self, duration: DurationCategory) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Validate the request for a provider of the given kind.
    pub fn validate_for(&self, kind: GenerationKind) -> Result<(), String> {
        if self.instruction_text.trim().is_empty() {
            return Err(match kind {
                GenerationKind::ImageToVideo => "Instruction text is required".to_string(),
                GenerationKind::TextToSpeech => "Text to synthesize is required".to_string(),
            });
        }

        if kind == GenerationKind::ImageToVideo && self.source_media.is_none() {
            return Err("Source media is required for image-to-video".to_string());
        }

        Ok(())
    }
}
