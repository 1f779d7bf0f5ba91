//! FFmpeg render composition for vgen.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeouts via tokio
//! - Scene asset materialization and filter graph composition
//! - The render engine that ties them together

pub mod assets;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod graph;
pub mod probe;
pub mod progress;
pub mod render;
pub mod subtitles;

pub use assets::{AssetFetcher, SceneAssets};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use graph::{CompositionGraph, OutputFormat, SceneSegment};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use render::{RenderConfig, RenderEngine, RenderJob, RenderOutput, RetentionPolicy};
pub use subtitles::{build_srt, SubtitleFormat};
