//! Polling, batch and motion pipeline tests against scripted providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use vgen_models::{
    GenerationKind, GenerationRequest, JobId, MediaLocator, MediaState, PipelineEvent, Scene,
    SceneStatus, StatusReport,
};
use vgen_providers::{GenerationProvider, PollPolicy, ProviderError, ProviderRegistry, ProviderResult};
use vgen_worker::{
    ImageNormalizer, JobRunner, MotionPipeline, MotionSettings, NarrationBatch, WorkerError,
};

/// Provider that replays a fixed status script for every job.
struct ScriptedProvider {
    key: &'static str,
    kind: GenerationKind,
    policy: PollPolicy,
    script: Vec<StatusReport>,
    /// Jobs whose text contains this marker report failure
    fail_marker: Option<&'static str>,
    submissions: AtomicUsize,
    jobs: Mutex<HashMap<String, (String, usize)>>,
}

impl ScriptedProvider {
    fn new(key: &'static str, kind: GenerationKind, script: Vec<StatusReport>) -> Self {
        Self {
            key,
            kind,
            policy: PollPolicy::new(Duration::from_millis(1), 5),
            script,
            fail_marker: None,
            submissions: AtomicUsize::new(0),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_marker = Some(marker);
        self
    }

    fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn key(&self) -> &str {
        self.key
    }

    fn kind(&self) -> GenerationKind {
        self.kind
    }

    fn accepts_inline_source(&self) -> bool {
        true
    }

    fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn submit_validated(&self, request: &GenerationRequest) -> ProviderResult<JobId> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}-job-{}", self.key, n);
        self.jobs
            .lock()
            .unwrap()
            .insert(id.clone(), (request.instruction_text.clone(), 0));
        Ok(JobId::from_string(id))
    }

    async fn check_status(&self, job_id: &JobId) -> ProviderResult<StatusReport> {
        let mut jobs = self.jobs.lock().unwrap();
        let (text, checks) = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| ProviderError::status_failed(self.key, "unknown job"))?;

        if let Some(marker) = self.fail_marker {
            if text.contains(marker) {
                return Ok(StatusReport::failed("vendor rejected the request"));
            }
        }

        let report = self.script[(*checks).min(self.script.len() - 1)].clone();
        *checks += 1;
        Ok(report)
    }

    async fn get_result(&self, job_id: &JobId) -> ProviderResult<MediaLocator> {
        Ok(MediaLocator::Url(format!("https://cdn.test/{}.out", job_id)))
    }
}

fn completing_script() -> Vec<StatusReport> {
    vec![
        StatusReport::pending(),
        StatusReport::processing(None),
        StatusReport::processing(Some(50)),
        StatusReport::completed(),
    ]
}

fn runner_with(providers: Vec<Arc<ScriptedProvider>>) -> JobRunner {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register_instance(provider);
    }
    JobRunner::new(Arc::new(registry))
}

fn image() -> MediaLocator {
    MediaLocator::Url("https://x.test/scene.png".into())
}

#[tokio::test]
async fn test_run_to_completion_reports_monotonic_progress() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        completing_script(),
    ));
    let runner = runner_with(vec![provider.clone()]);
    let request = GenerationRequest::image_to_video("video", image(), "push in");

    let mut seen = Vec::new();
    let media = runner
        .run_to_completion(&request, None, |p| seen.push(p.percent))
        .await
        .unwrap();

    assert_eq!(media, MediaLocator::Url("https://cdn.test/video-job-0.out".into()));
    assert_eq!(provider.submissions(), 1);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backward: {seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert!(seen[..seen.len() - 1].iter().all(|p| *p < 100));
}

#[tokio::test]
async fn test_never_terminal_job_times_out() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        vec![StatusReport::processing(None)],
    ));
    let runner = runner_with(vec![provider.clone()]);
    let request = GenerationRequest::image_to_video("video", image(), "push in");

    let err = runner.run_to_completion(&request, None, |_| {}).await.unwrap_err();

    match err {
        WorkerError::GenerationTimeout { attempts, .. } => assert_eq!(attempts, 5),
        other => panic!("expected timeout, got {other:?}"),
    }
    let jobs = provider.jobs.lock().unwrap();
    assert_eq!(jobs.values().next().unwrap().1, 5);
}

#[tokio::test]
async fn test_vendor_failure_carries_detail() {
    let provider = Arc::new(
        ScriptedProvider::new("video", GenerationKind::ImageToVideo, completing_script())
            .failing_on("forbidden"),
    );
    let runner = runner_with(vec![provider]);
    let request = GenerationRequest::image_to_video("video", image(), "something forbidden");

    let err = runner.run_to_completion(&request, None, |_| {}).await.unwrap_err();

    assert!(matches!(
        &err,
        WorkerError::GenerationFailed { detail, .. } if detail == "vendor rejected the request"
    ));
}

#[tokio::test]
async fn test_unknown_provider_fails_before_submission() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        completing_script(),
    ));
    let runner = runner_with(vec![provider.clone()]);
    let request = GenerationRequest::image_to_video("nope", image(), "push in");

    let err = runner.run_to_completion(&request, None, |_| {}).await.unwrap_err();

    assert!(matches!(
        err,
        WorkerError::Provider(ProviderError::UnsupportedProvider(_))
    ));
    assert_eq!(provider.submissions(), 0);
}

#[tokio::test]
async fn test_invalid_request_never_submits() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        completing_script(),
    ));
    let runner = runner_with(vec![provider.clone()]);
    let mut request = GenerationRequest::image_to_video("video", image(), "push in");
    request.source_media = None;

    let err = runner.run_to_completion(&request, None, |_| {}).await.unwrap_err();

    assert!(matches!(err, WorkerError::Provider(ProviderError::InvalidRequest(_))));
    assert_eq!(provider.submissions(), 0);
}

#[tokio::test]
async fn test_cancelled_poll_stops() {
    let mut provider = ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        vec![StatusReport::processing(None)],
    );
    provider.policy = PollPolicy::new(Duration::from_secs(60), 10);
    let runner = runner_with(vec![Arc::new(provider)]);
    let request = GenerationRequest::image_to_video("video", image(), "push in");

    let (tx, rx) = watch::channel(false);
    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).ok();
        tx
    });

    let err = runner
        .run_to_completion(&request, Some(&rx), |_| {})
        .await
        .unwrap_err();
    let _tx = cancel.await.unwrap();

    assert!(matches!(err, WorkerError::Cancelled));
}

#[tokio::test]
async fn test_batch_narration_isolates_failures() {
    let tts = Arc::new(
        ScriptedProvider::new("tts", GenerationKind::TextToSpeech, completing_script())
            .failing_on("cursed"),
    );
    let runner = runner_with(vec![tts.clone()]);
    let mut scenes = vec![
        Scene::new("s1", "The journey begins."),
        Scene::new("s2", "A cursed line."),
        Scene::new("s3", "The end."),
    ];

    let result = NarrationBatch::new(runner, "tts").narrate(&mut scenes).await;

    assert_eq!(result.total_count, 3);
    assert_eq!(result.success_count, 2);
    let failed = result.get("s2").unwrap();
    assert!(!failed.success);
    assert!(!failed.error_detail.as_deref().unwrap_or_default().is_empty());

    assert!(scenes[0].audio.is_ready());
    assert_eq!(scenes[1].audio, MediaState::None);
    assert!(scenes[2].audio.is_ready());
}

#[tokio::test]
async fn test_empty_narration_fails_without_network() {
    let tts = Arc::new(ScriptedProvider::new(
        "tts",
        GenerationKind::TextToSpeech,
        completing_script(),
    ));
    let runner = runner_with(vec![tts.clone()]);
    let mut scenes = vec![Scene::new("s1", "   "), Scene::new("s2", "Hello.")];

    let result = NarrationBatch::new(runner, "tts").narrate(&mut scenes).await;

    assert_eq!(result.success_count, 1);
    assert!(!result.get("s1").unwrap().success);
    assert_eq!(tts.submissions(), 1);
}

fn pipeline(provider: Arc<ScriptedProvider>) -> MotionPipeline {
    let runner = runner_with(vec![provider.clone()]);
    MotionPipeline::new(runner, ImageNormalizer::default(), Arc::new(MotionSettings::default()))
        .with_provider(provider.key)
}

#[tokio::test]
async fn test_motion_pipeline_skips_ready_and_survives_failures() {
    let provider = Arc::new(
        ScriptedProvider::new("video", GenerationKind::ImageToVideo, completing_script())
            .failing_on("storm"),
    );
    let (tx, mut rx) = mpsc::channel(64);
    let pipeline = pipeline(provider.clone()).with_events(tx);

    let mut already = Scene::new("s1", "Calm sea").with_image(image());
    already.video = MediaState::Ready(MediaLocator::Url("https://cdn.test/existing.mp4".into()));
    let mut scenes = vec![
        already,
        Scene::new("s2", "A storm rolls in").with_image(image()),
        Scene::new("s3", "No picture here"),
        Scene::new("s4", "Sunrise").with_image(image()),
    ];

    let summary = pipeline.animate_all(&mut scenes).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].scene_id, "s2");
    assert!(summary.error_message().is_some());
    // Only s2 and s4 reached the provider; s3 failed normalization.
    assert_eq!(provider.submissions(), 2);

    assert_eq!(
        scenes[0].video,
        MediaState::Ready(MediaLocator::Url("https://cdn.test/existing.mp4".into()))
    );
    assert_eq!(scenes[1].video, MediaState::None);
    assert_eq!(scenes[1].status, SceneStatus::Completed);
    assert_eq!(scenes[2].video, MediaState::None);
    assert!(scenes[3].video.is_ready());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.first(), Some(&PipelineEvent::Started { total: 4 }));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Finished { succeeded: 1, failed: 2, skipped: 1, .. })
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::SceneProgress { index: 3, .. })));
}

#[tokio::test]
async fn test_rerun_does_not_resubmit_ready_scenes() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        completing_script(),
    ));
    let pipeline = pipeline(provider.clone());
    let mut scenes = vec![
        Scene::new("s1", "One").with_image(image()),
        Scene::new("s2", "Two").with_image(image()),
    ];

    pipeline.animate_all(&mut scenes).await;
    assert_eq!(provider.submissions(), 2);

    let summary = pipeline.animate_all(&mut scenes).await;
    assert_eq!(summary.skipped, 2);
    assert_eq!(provider.submissions(), 2);
}

#[tokio::test]
async fn test_reanimate_single_scene_always_submits() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        completing_script(),
    ));
    let pipeline = pipeline(provider.clone());
    let mut scenes = vec![Scene::new("s1", "One").with_image(image())];
    scenes[0].video = MediaState::Ready(MediaLocator::Url("https://cdn.test/old.mp4".into()));

    let summary = pipeline.animate_scene(&mut scenes, "s1").await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(provider.submissions(), 1);
    assert_eq!(
        scenes[0].video,
        MediaState::Ready(MediaLocator::Url("https://cdn.test/video-job-0.out".into()))
    );

    let err = pipeline.animate_scene(&mut scenes, "missing").await.unwrap_err();
    assert!(matches!(err, WorkerError::SceneNotFound(_)));
}

#[tokio::test]
async fn test_cancelled_pipeline_stops_between_scenes() {
    let provider = Arc::new(ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        completing_script(),
    ));
    let (_tx, rx) = watch::channel(true);
    let pipeline = pipeline(provider.clone()).with_cancel(rx);
    let mut scenes = vec![Scene::new("s1", "One").with_image(image())];

    let summary = pipeline.animate_all(&mut scenes).await;

    assert!(summary.cancelled);
    assert_eq!(provider.submissions(), 0);
    assert_eq!(scenes[0].video, MediaState::None);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_in_flight_scene() {
    let mut provider = ScriptedProvider::new(
        "video",
        GenerationKind::ImageToVideo,
        vec![StatusReport::processing(None)],
    );
    provider.policy = PollPolicy::new(Duration::from_secs(3), 120);
    let provider = Arc::new(provider);

    let (tx, rx) = watch::channel(false);
    let pipeline = pipeline(provider.clone()).with_cancel(rx);
    let mut scenes = vec![
        Scene::new("s1", "One").with_image(image()),
        Scene::new("s2", "Two").with_image(image()),
    ];

    let started = tokio::time::Instant::now();
    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(true).ok();
        tx
    });

    let summary = pipeline.animate_all(&mut scenes).await;
    let _tx = cancel.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(summary.cancelled);
    assert_eq!(summary.failed, 0);
    assert!(summary.last_error.is_none());
    assert_eq!(provider.submissions(), 1);
    assert_eq!(scenes[0].video, MediaState::None);
    assert_eq!(scenes[0].status, SceneStatus::Idle);
    assert_eq!(scenes[1].status, SceneStatus::Idle);
}

#[tokio::test]
async fn test_failed_reanimate_keeps_previous_clip() {
    let provider = Arc::new(
        ScriptedProvider::new("video", GenerationKind::ImageToVideo, completing_script())
            .failing_on("storm"),
    );
    let pipeline = pipeline(provider.clone());
    let old = MediaState::Ready(MediaLocator::Url("https://cdn.test/old.mp4".into()));
    let mut scenes = vec![Scene::new("s1", "A storm rolls in").with_image(image())];
    scenes[0].video = old.clone();

    let summary = pipeline.animate_scene(&mut scenes, "s1").await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(provider.submissions(), 1);
    assert_eq!(scenes[0].video, old);
    assert_eq!(scenes[0].status, SceneStatus::Completed);
}
