//! Scene motion pipeline.
//!
//! Animates scenes one at a time, in order. Every event the pipeline emits
//! is built from [`PipelineState`] alone; the loop only advances the state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, Instrument};
use vgen_models::{find_scene, JobStatus, MediaState, PipelineEvent, Scene, SceneStatus};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::normalize::ImageNormalizer;
use crate::poller::{is_cancelled, JobRunner};
use crate::settings::MotionSettings;

/// Position and counters of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub total: usize,
    pub index: usize,
    pub scene_id: String,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub last_error: Option<String>,
}

impl PipelineState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn started(&self) -> PipelineEvent {
        PipelineEvent::Started { total: self.total }
    }

    /// Move to scene `index`.
    pub fn enter(&mut self, index: usize, scene_id: &str) -> PipelineEvent {
        self.index = index;
        self.scene_id = scene_id.to_string();
        PipelineEvent::SceneStarted {
            index,
            total: self.total,
            scene_id: self.scene_id.clone(),
        }
    }

    pub fn skip(&mut self, index: usize, scene_id: &str) -> PipelineEvent {
        self.index = index;
        self.scene_id = scene_id.to_string();
        self.skipped += 1;
        PipelineEvent::SceneSkipped {
            index,
            total: self.total,
            scene_id: self.scene_id.clone(),
        }
    }

    pub fn progress(&self, status: JobStatus, percent: u8) -> PipelineEvent {
        PipelineEvent::SceneProgress {
            index: self.index,
            total: self.total,
            scene_id: self.scene_id.clone(),
            status,
            percent,
        }
    }

    pub fn succeed(&mut self) -> PipelineEvent {
        self.succeeded += 1;
        PipelineEvent::SceneCompleted {
            index: self.index,
            total: self.total,
            scene_id: self.scene_id.clone(),
        }
    }

    pub fn fail(&mut self, error: String) -> PipelineEvent {
        self.failed += 1;
        self.last_error = Some(error.clone());
        PipelineEvent::SceneFailed {
            index: self.index,
            total: self.total,
            scene_id: self.scene_id.clone(),
            error,
        }
    }

    pub fn finish(&self) -> PipelineEvent {
        PipelineEvent::Finished {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            cancelled: self.cancelled,
        }
    }
}

/// Per-scene failure kept for the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFailure {
    pub scene_id: String,
    pub index: usize,
    pub error: String,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub last_error: Option<String>,
    pub failures: Vec<SceneFailure>,
}

impl MotionSummary {
    fn from_state(state: &PipelineState, failures: Vec<SceneFailure>) -> Self {
        Self {
            total: state.total,
            succeeded: state.succeeded,
            failed: state.failed,
            skipped: state.skipped,
            cancelled: state.cancelled,
            last_error: state.last_error.clone(),
            failures,
        }
    }

    /// User-facing error line, when any scene failed.
    pub fn error_message(&self) -> Option<String> {
        let last = self.last_error.as_deref()?;
        Some(format!(
            "{} of {} scenes could not be animated and will use a still image. Last error: {}",
            self.failed, self.total, last
        ))
    }
}

/// Sequential image-to-video pipeline over a scene list.
#[derive(Clone)]
pub struct MotionPipeline {
    runner: JobRunner,
    normalizer: ImageNormalizer,
    settings: Arc<MotionSettings>,
    provider: String,
    events: Option<mpsc::Sender<PipelineEvent>>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl MotionPipeline {
    pub fn new(runner: JobRunner, normalizer: ImageNormalizer, settings: Arc<MotionSettings>) -> Self {
        let provider = settings.video_provider.clone();
        Self {
            runner,
            normalizer,
            settings,
            provider,
            events: None,
            cancel_rx: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop once the signal flips to `true`, including mid-poll.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Animate every scene that has no usable video yet.
    pub async fn animate_all(&self, scenes: &mut [Scene]) -> MotionSummary {
        let run_id = uuid::Uuid::new_v4().to_string();
        let logger = JobLogger::for_run(&run_id, &self.provider, "motion_pipeline");
        let mut state = PipelineState::new(scenes.len());
        let mut failures = Vec::new();

        async {
            logger.log_start(&format!("{} scenes", scenes.len()));
            self.emit(state.started());

            for (index, scene) in scenes.iter_mut().enumerate() {
                if is_cancelled(self.cancel_rx.as_ref()) {
                    state.cancelled = true;
                    logger.log_warning(&format!("cancelled before scene {}", index + 1));
                    break;
                }

                if scene.has_usable_video() {
                    self.emit(state.skip(index, &scene.id));
                    continue;
                }

                self.emit(state.enter(index, &scene.id));
                if let Some(failure) = self.animate_one(scene, &mut state).await {
                    failures.push(failure);
                }
                if state.cancelled {
                    logger.log_warning(&format!("cancelled during scene {}", index + 1));
                    break;
                }
            }

            self.emit(state.finish());
            logger.log_completion(&state.finish().message());
        }
        .instrument(logger.span())
        .await;

        MotionSummary::from_state(&state, failures)
    }

    /// Re-animate one scene by id. Always re-submits.
    pub async fn animate_scene(&self, scenes: &mut [Scene], scene_id: &str) -> WorkerResult<MotionSummary> {
        let index = find_scene(scenes, scene_id)
            .ok_or_else(|| WorkerError::SceneNotFound(scene_id.to_string()))?;

        let mut state = PipelineState::new(scenes.len());
        let scene = &mut scenes[index];
        self.emit(state.enter(index, &scene.id));

        let failures: Vec<_> = self.animate_one(scene, &mut state).await.into_iter().collect();
        self.emit(state.finish());

        let mut summary = MotionSummary::from_state(&state, failures);
        summary.total = 1;
        Ok(summary)
    }

    /// Run one scene through normalization and generation.
    ///
    /// A clip the scene already had survives a failed or cancelled attempt.
    async fn animate_one(&self, scene: &mut Scene, state: &mut PipelineState) -> Option<SceneFailure> {
        scene.status = SceneStatus::Processing;
        let previous = std::mem::replace(&mut scene.video, MediaState::Pending);
        let fallback = if previous.is_ready() { previous } else { MediaState::None };

        let result = self.generate(scene, state).await;

        if let Err(WorkerError::Cancelled) = result {
            state.cancelled = true;
            scene.status = if fallback.is_ready() {
                SceneStatus::Completed
            } else {
                SceneStatus::Idle
            };
            scene.video = fallback;
            return None;
        }

        // Completed either way; a videoless scene falls back to its still image.
        scene.status = SceneStatus::Completed;
        match result {
            Ok(media) => {
                info!(scene_id = %scene.id, media = %media.describe(), "Scene animated");
                scene.video = MediaState::Ready(media);
                self.emit(state.succeed());
                None
            }
            Err(e) => {
                scene.video = fallback;
                let error = e.to_string();
                self.emit(state.fail(error.clone()));
                Some(SceneFailure {
                    scene_id: scene.id.clone(),
                    index: state.index,
                    error,
                })
            }
        }
    }

    async fn generate(&self, scene: &Scene, state: &PipelineState) -> WorkerResult<vgen_models::MediaLocator> {
        let provider = self.runner.registry().get(&self.provider)?;
        let image = self
            .normalizer
            .normalize(scene.image.as_ref(), provider.accepts_inline_source())
            .await?;
        let request = self.settings.video_request(scene, image, &self.provider);

        let snapshot = state.clone();
        let events = self.events.clone();
        self.runner
            .run_to_completion(&request, self.cancel_rx.as_ref(), move |p| {
                send_event(events.as_ref(), snapshot.progress(p.status, p.percent));
            })
            .await
    }

    fn emit(&self, event: PipelineEvent) {
        send_event(self.events.as_ref(), event);
    }
}

fn send_event(events: Option<&mpsc::Sender<PipelineEvent>>, event: PipelineEvent) {
    debug!("{}", event.message());
    if let Some(tx) = events {
        if let Err(e) = tx.try_send(event) {
            debug!("Dropped pipeline event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_drives_events() {
        let mut state = PipelineState::new(3);
        assert_eq!(state.started().message(), "Animating 3 scenes");

        assert_eq!(state.skip(0, "a").message(), "Scene 1/3: already animated");
        assert_eq!(state.enter(1, "b").message(), "Scene 2/3: submitting");
        assert_eq!(
            state.progress(JobStatus::Processing, 40).message(),
            "Scene 2/3: processing (40%)"
        );
        state.fail("boom".to_string());
        state.enter(2, "c");
        state.succeed();

        assert_eq!(
            state.finish(),
            PipelineEvent::Finished {
                total: 3,
                succeeded: 1,
                failed: 1,
                skipped: 1,
                cancelled: false,
            }
        );
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_summary_message() {
        let mut state = PipelineState::new(4);
        let clean = MotionSummary::from_state(&state, Vec::new());
        assert!(clean.error_message().is_none());

        state.enter(0, "a");
        state.fail("vendor exploded".to_string());
        let summary = MotionSummary::from_state(&state, Vec::new());
        assert_eq!(
            summary.error_message().unwrap(),
            "1 of 4 scenes could not be animated and will use a still image. Last error: vendor exploded"
        );
    }
}
