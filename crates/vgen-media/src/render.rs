//! Render composition engine.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::fs;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};
use vgen_models::{JobId, RenderRequest};

use crate::assets::{AssetFetcher, SceneAssets};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{move_file, remove_dir_best_effort};
use crate::graph::{CompositionGraph, OutputFormat, SceneSegment};
use crate::probe::probe_duration;
use crate::subtitles::write_subtitles;

/// Metric names.
pub mod names {
    pub const RENDER_JOBS_TOTAL: &str = "vgen_render_jobs_total";
    pub const RENDER_DURATION_SECONDS: &str = "vgen_render_duration_seconds";
}

/// What happens to a job's working directory afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Always delete
    Never,
    /// Keep failed jobs for inspection
    #[default]
    OnFailure,
    Always,
}

impl RetentionPolicy {
    pub fn keep(&self, succeeded: bool) -> bool {
        match self {
            RetentionPolicy::Never => false,
            RetentionPolicy::OnFailure => !succeeded,
            RetentionPolicy::Always => true,
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(RetentionPolicy::Never),
            "on_failure" | "on-failure" => Ok(RetentionPolicy::OnFailure),
            "always" => Ok(RetentionPolicy::Always),
            other => Err(format!("unknown retention policy: {}", other)),
        }
    }
}

/// Render engine configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Parent of per-job working directories
    pub work_root: PathBuf,
    /// Where finished outputs are moved
    pub output_dir: PathBuf,
    pub preset: String,
    pub crf: u8,
    pub audio_bitrate: String,
    pub fps: u32,
    pub sample_rate: u32,
    pub encode_timeout: Duration,
    pub download_timeout: Duration,
    pub retention: RetentionPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("vgen-render"),
            output_dir: PathBuf::from("./renders"),
            preset: "veryfast".to_string(),
            crf: 23,
            audio_bitrate: "192k".to_string(),
            fps: 30,
            sample_rate: 44_100,
            encode_timeout: Duration::from_secs(1800),
            download_timeout: Duration::from_secs(120),
            retention: RetentionPolicy::OnFailure,
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            work_root: std::env::var("RENDER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_root),
            output_dir: std::env::var("RENDER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            preset: std::env::var("RENDER_PRESET").unwrap_or(defaults.preset),
            crf: std::env::var("RENDER_CRF")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|crf| *crf <= 51)
                .unwrap_or(defaults.crf),
            audio_bitrate: defaults.audio_bitrate,
            fps: defaults.fps,
            sample_rate: defaults.sample_rate,
            encode_timeout: std::env::var("RENDER_ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.encode_timeout),
            download_timeout: std::env::var("RENDER_DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            retention: std::env::var("RENDER_RETAIN_WORK_DIRS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retention),
        }
    }
}

/// State of one render invocation. Everything intermediate lives in `work_dir`.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub job_id: JobId,
    pub work_dir: PathBuf,
    pub assets: Vec<SceneAssets>,
    pub subtitle_path: Option<PathBuf>,
    pub output_path: PathBuf,
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub job_id: JobId,
    pub path: PathBuf,
    /// Probed output duration; `None` when ffprobe is unavailable
    pub duration_secs: Option<f64>,
    pub expected_duration_secs: f64,
    pub warnings: Vec<String>,
}

/// Composes scenes into a single output file.
#[derive(Clone)]
pub struct RenderEngine {
    config: RenderConfig,
    fetcher: AssetFetcher,
}

impl RenderEngine {
    pub fn new(config: RenderConfig) -> MediaResult<Self> {
        let fetcher = AssetFetcher::new(config.download_timeout)?;
        Ok(Self { config, fetcher })
    }

    pub fn with_fetcher(config: RenderConfig, fetcher: AssetFetcher) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a request. Asset problems become warnings; encode failures abort.
    pub async fn render(
        &self,
        request: &RenderRequest,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<RenderOutput> {
        request.validate().map_err(MediaError::InvalidRequest)?;

        let job_id = JobId::new();
        let span = info_span!("render_job", job_id = %job_id, scenes = request.scenes.len());
        let start = Instant::now();

        let work_dir = self.config.work_root.join(job_id.as_str());
        let result = self
            .run_job(&job_id, &work_dir, request, cancel_rx)
            .instrument(span)
            .await;

        let succeeded = result.is_ok();
        let outcome = match &result {
            Ok(_) => "success",
            Err(MediaError::Cancelled) => "cancelled",
            Err(_) => "failure",
        };
        counter!(names::RENDER_JOBS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(names::RENDER_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        if self.config.retention.keep(succeeded) {
            info!(job_id = %job_id, work_dir = %work_dir.display(), "Keeping render work directory");
        } else {
            remove_dir_best_effort(&work_dir).await;
        }

        result
    }

    async fn run_job(
        &self,
        job_id: &JobId,
        work_dir: &Path,
        request: &RenderRequest,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<RenderOutput> {
        let assets_dir = work_dir.join("assets");
        fs::create_dir_all(&assets_dir).await?;

        let expected = request.expected_duration();
        info!(expected_secs = expected, "Render started");

        let assets = self
            .fetcher
            .materialize_scenes(&request.scenes, &assets_dir)
            .await;

        let subtitle_path = match request.subtitles.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(text) => Some(write_subtitles(work_dir, text).await?),
            None => None,
        };

        let job = RenderJob {
            job_id: job_id.clone(),
            work_dir: work_dir.to_path_buf(),
            assets,
            subtitle_path,
            output_path: work_dir.join("output.mp4"),
        };

        let warnings: Vec<String> = job
            .assets
            .iter()
            .flat_map(|a| a.warnings.iter().cloned())
            .collect();

        self.encode(&job, request, cancel_rx).await?;

        let final_path = self
            .config
            .output_dir
            .join(format!("{}.mp4", job_id.as_str()));
        move_file(&job.output_path, &final_path).await?;

        let duration_secs = match probe_duration(&final_path).await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Could not probe render output: {}", e);
                None
            }
        };

        if let Some(actual) = duration_secs {
            if (actual - expected).abs() > 0.5 {
                warn!(actual, expected, "Render duration differs from scene total");
            }
        }

        info!(output = %final_path.display(), warnings = warnings.len(), "Render completed");

        Ok(RenderOutput {
            job_id: job_id.clone(),
            path: final_path,
            duration_secs,
            expected_duration_secs: expected,
            warnings,
        })
    }

    /// Build the composition and run ffmpeg once.
    async fn encode(
        &self,
        job: &RenderJob,
        request: &RenderRequest,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let segments: Vec<SceneSegment> = job
            .assets
            .iter()
            .zip(&request.scenes)
            .map(|(assets, scene)| SceneSegment::from_assets(assets, scene.duration_secs))
            .collect();

        let format = OutputFormat {
            width: request.width,
            height: request.height,
            fps: self.config.fps,
            sample_rate: self.config.sample_rate,
        };
        let graph = CompositionGraph::build(&segments, &format, job.subtitle_path.as_deref());
        debug!(filter = %graph.filter, "Composition graph built");

        let cmd = self.encode_command(&graph, &job.output_path);

        let mut runner = FfmpegRunner::new().with_timeout(self.config.encode_timeout);
        if let Some(rx) = cancel_rx {
            runner = runner.with_cancel(rx);
        }

        let total = request.expected_duration();
        let last_logged = Arc::new(AtomicU8::new(0));
        let job_id = job.job_id.clone();
        let result = runner
            .run_with_progress(&cmd, move |progress| {
                let pct = progress.percent_of(total);
                if pct >= last_logged.load(Ordering::Relaxed).saturating_add(10) {
                    last_logged.store(pct, Ordering::Relaxed);
                    info!(job_id = %job_id, percent = pct, speed = progress.speed, "Encoding");
                }
            })
            .await;

        result.map_err(|e| match e {
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code,
            } => {
                let scene_index = stderr.as_deref().and_then(|s| graph.scene_in_stderr(s));
                MediaError::RenderEncode {
                    job_id: job.job_id.to_string(),
                    scene_index,
                    message: match exit_code {
                        Some(code) => format!("{} (exit code {})", message, code),
                        None => message,
                    },
                    stderr_tail: stderr,
                }
            }
            MediaError::Timeout(secs) => MediaError::RenderEncode {
                job_id: job.job_id.to_string(),
                scene_index: None,
                message: format!("encode timed out after {} seconds", secs),
                stderr_tail: None,
            },
            other => other,
        })
    }

    fn encode_command(&self, graph: &CompositionGraph, output: &Path) -> FfmpegCommand {
        graph
            .apply(FfmpegCommand::new(output))
            .video_codec("libx264")
            .preset(self.config.preset.clone())
            .crf(self.config.crf)
            .output_args(["-pix_fmt", "yuv420p", "-r"])
            .output_arg(self.config.fps.to_string())
            .audio_codec("aac")
            .audio_bitrate(self.config.audio_bitrate.clone())
            .output_args(["-ar"])
            .output_arg(self.config.sample_rate.to_string())
            .output_args(["-ac", "2", "-shortest", "-movflags", "+faststart"])
    }
}
