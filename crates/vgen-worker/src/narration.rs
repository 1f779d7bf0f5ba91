//! Batch narration: one text-to-speech generation per scene.

use tracing::info_span;
use tracing::Instrument;
use vgen_models::{BatchResult, GenerationRequest, MediaState, Scene};
use vgen_providers::ProviderError;

use crate::batch::run_batch;
use crate::error::WorkerError;
use crate::poller::JobRunner;
use crate::settings::MotionSettings;

#[derive(Clone, Debug)]
pub struct NarrationBatch {
    runner: JobRunner,
    provider: String,
    voice: Option<String>,
}

impl NarrationBatch {
    pub fn new(runner: JobRunner, provider: impl Into<String>) -> Self {
        Self {
            runner,
            provider: provider.into(),
            voice: None,
        }
    }

    pub fn from_settings(runner: JobRunner, settings: &MotionSettings) -> Self {
        Self {
            runner,
            provider: settings.narration_provider.clone(),
            voice: settings.voice.clone(),
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Narrate every scene concurrently and attach the audio that succeeded.
    ///
    /// Scenes whose synthesis fails end with `audio = none`.
    pub async fn narrate(&self, scenes: &mut [Scene]) -> BatchResult {
        let items: Vec<(String, GenerationRequest)> = scenes
            .iter_mut()
            .map(|scene| {
                scene.audio = MediaState::Pending;
                let mut request = GenerationRequest::speech(&self.provider, scene.narration_text.trim());
                request.voice = self.voice.clone();
                (scene.id.clone(), request)
            })
            .collect();

        let span = info_span!("narration_batch", provider = %self.provider, scenes = items.len());
        let result = run_batch(items, |request| async move {
            if request.instruction_text.is_empty() {
                return Err(WorkerError::from(ProviderError::invalid_request(
                    "Scene has no narration text",
                )));
            }
            self.runner.run_to_completion(&request, None, |_| {}).await
        })
        .instrument(span)
        .await;

        for (scene, item) in scenes.iter_mut().zip(&result.items) {
            scene.audio = match &item.result_media {
                Some(media) if item.success => MediaState::Ready(media.clone()),
                _ => MediaState::None,
            };
        }

        result
    }
}
