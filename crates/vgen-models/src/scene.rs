//! Scenes and per-track media state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{MediaLocator, MotionType, RenderScene};

fn default_scene_duration() -> f64 {
    5.0
}

/// State of one generated track on a scene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", content = "locator", rename_all = "snake_case")]
pub enum MediaState {
    #[default]
    None,
    /// Submitted, result not attached yet
    Pending,
    Ready(MediaLocator),
}

impl MediaState {
    pub fn is_ready(&self) -> bool {
        matches!(self, MediaState::Ready(_))
    }

    pub fn locator(&self) -> Option<&MediaLocator> {
        match self {
            MediaState::Ready(locator) => Some(locator),
            _ => None,
        }
    }
}

/// Processing status of a scene in the motion pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    #[default]
    Idle,
    Processing,
    Completed,
}

/// One shot of the final video. Index in the scene list is its temporal position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub narration_text: String,
    /// Prompt describing the shot; narration is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaLocator>,
    #[serde(default)]
    pub video: MediaState,
    #[serde(default)]
    pub audio: MediaState,
    #[serde(default)]
    pub status: SceneStatus,
    #[serde(default)]
    pub motion: MotionType,
    #[serde(default = "default_scene_duration")]
    pub duration_secs: f64,
}

impl Scene {
    pub fn new(id: impl Into<String>, narration_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            narration_text: narration_text.into(),
            visual_prompt: None,
            image: None,
            video: MediaState::None,
            audio: MediaState::None,
            status: SceneStatus::Idle,
            motion: MotionType::default(),
            duration_secs: default_scene_duration(),
        }
    }

    pub fn with_image(mut self, image: MediaLocator) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_motion(mut self, motion: MotionType) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_visual_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.visual_prompt = Some(prompt.into());
        self
    }

    /// Whether a generated clip is already attached.
    pub fn has_usable_video(&self) -> bool {
        self.video.is_ready()
    }

    /// Prompt text for image-to-video generation.
    pub fn prompt(&self) -> &str {
        self.visual_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.narration_text)
    }

    /// Every locator the scene carries: image, video and audio.
    pub fn media(&self) -> impl Iterator<Item = &MediaLocator> {
        self.image
            .iter()
            .chain(self.video.locator())
            .chain(self.audio.locator())
    }

    /// Render input for this scene: the generated clip, else the still image.
    pub fn render_scene(&self) -> RenderScene {
        let video = self
            .video
            .locator()
            .cloned()
            .or_else(|| self.image.clone());
        RenderScene {
            video,
            audio: self.audio.locator().cloned(),
            duration_secs: self.duration_secs,
        }
    }
}

/// Index of the scene with the given id.
pub fn find_scene(scenes: &[Scene], scene_id: &str) -> Option<usize> {
    scenes.iter().position(|s| s.id == scene_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_state_serde() {
        let ready = MediaState::Ready(MediaLocator::Url("https://x.test/v.mp4".into()));
        let json = serde_json::to_value(&ready).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "ready", "locator": "https://x.test/v.mp4"})
        );

        let none: MediaState = serde_json::from_value(serde_json::json!({"state": "none"})).unwrap();
        assert_eq!(none, MediaState::None);
    }

    #[test]
    fn test_scene_defaults_from_minimal_json() {
        let scene: Scene = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "narration_text": "Dawn breaks",
        }))
        .unwrap();

        assert_eq!(scene.status, SceneStatus::Idle);
        assert_eq!(scene.video, MediaState::None);
        assert_eq!(scene.duration_secs, 5.0);
        assert_eq!(scene.prompt(), "Dawn breaks");
    }

    #[test]
    fn test_render_scene_prefers_video_over_image() {
        let image = MediaLocator::Url("https://x.test/a.png".into());
        let video = MediaLocator::Url("https://x.test/a.mp4".into());

        let mut scene = Scene::new("s1", "text").with_image(image.clone());
        assert_eq!(scene.render_scene().video, Some(image));

        scene.video = MediaState::Ready(video.clone());
        assert_eq!(scene.render_scene().video, Some(video));
    }

    #[test]
    fn test_find_scene() {
        let scenes = vec![Scene::new("a", ""), Scene::new("b", "")];
        assert_eq!(find_scene(&scenes, "b"), Some(1));
        assert_eq!(find_scene(&scenes, "zzz"), None);
    }

    #[test]
    fn test_scene_media_lists_every_locator() {
        let mut scene = Scene::new("a", "").with_image(MediaLocator::local("/srv/a.png"));
        scene.video = MediaState::Pending;
        scene.audio = MediaState::Ready(MediaLocator::Url("https://x.test/a.mp3".into()));

        let media: Vec<_> = scene.media().collect();
        assert_eq!(media.len(), 2);
        assert!(media[0].is_local());
        assert!(!media[1].is_local());
    }
}
