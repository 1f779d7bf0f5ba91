//! Motion settings: per-motion instruction rules and the prompt template.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vgen_models::{AspectRatio, DurationCategory, GenerationRequest, MediaLocator, MotionType, Scene};

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Instruction text per motion type
    pub rules: HashMap<MotionType, String>,
    /// Optional template with `{motion}` and `{prompt}` placeholders
    pub prompt_template: Option<String>,
    /// Image-to-video provider used when a request names none
    pub video_provider: String,
    /// Text-to-speech provider for narration
    pub narration_provider: String,
    pub voice: Option<String>,
    pub duration: DurationCategory,
    pub aspect_ratio: AspectRatio,
}

impl Default for MotionSettings {
    fn default() -> Self {
        let rules = MotionType::ALL
            .iter()
            .map(|m| (*m, default_rule(*m).to_string()))
            .collect();

        Self {
            rules,
            prompt_template: None,
            video_provider: "fal".to_string(),
            narration_provider: "openai-tts".to_string(),
            voice: None,
            duration: DurationCategory::default(),
            aspect_ratio: AspectRatio::default(),
        }
    }
}

fn default_rule(motion: MotionType) -> &'static str {
    match motion {
        MotionType::ZoomIn => "Slow cinematic push in toward the subject",
        MotionType::ZoomOut => "Slow pull back revealing the surroundings",
        MotionType::PanLeft => "Smooth camera pan from right to left",
        MotionType::PanRight => "Smooth camera pan from left to right",
        MotionType::Static => "Locked-off camera with subtle ambient movement",
    }
}

impl MotionSettings {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> WorkerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WorkerError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut settings: MotionSettings = serde_json::from_str(&raw)?;

        // A partial rules table keeps the built-in text for the rest.
        for motion in MotionType::ALL {
            settings
                .rules
                .entry(motion)
                .or_insert_with(|| default_rule(motion).to_string());
        }

        info!(path = %path.display(), "Loaded motion settings");
        Ok(settings)
    }

    /// Load from `path` if given, falling back to defaults on any problem.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                warn!("Using default motion settings: {}", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn rule_for(&self, motion: MotionType) -> &str {
        self.rules
            .get(&motion)
            .map(String::as_str)
            .unwrap_or_else(|| default_rule(motion))
    }

    /// Instruction text for a scene.
    ///
    /// With a template, placeholders are substituted and nothing else is
    /// checked. Without one, the scene prompt is used as-is.
    pub fn instruction_for(&self, scene: &Scene) -> String {
        match &self.prompt_template {
            Some(template) => template
                .replace("{motion}", self.rule_for(scene.motion))
                .replace("{prompt}", scene.prompt()),
            None => scene.prompt().to_string(),
        }
    }

    /// Image-to-video request for `scene` with an already normalized image.
    pub fn video_request(&self, scene: &Scene, image: MediaLocator, provider: &str) -> GenerationRequest {
        let request = GenerationRequest::image_to_video(provider, image, self.instruction_for(scene))
            .with_duration(self.duration)
            .with_aspect_ratio(self.aspect_ratio);

        // Templates already place the motion rule in the text.
        if self.prompt_template.is_some() {
            request
        } else {
            request.with_motion_hint(self.rule_for(scene.motion))
        }
    }
}
