//! Generation orchestration for vgen.
//!
//! This crate provides:
//! - The job submission & polling engine ([`JobRunner`])
//! - The batch orchestrator and batch narration
//! - The sequential scene motion pipeline
//! - Motion settings, image normalization and the upload collaborator
//! - Retry helpers and structured job logging

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod motion;
pub mod narration;
pub mod normalize;
pub mod poller;
pub mod retry;
pub mod settings;
pub mod upload;

pub use batch::run_batch;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use motion::{MotionPipeline, MotionSummary, PipelineState, SceneFailure};
pub use narration::NarrationBatch;
pub use normalize::ImageNormalizer;
pub use poller::{job_id_of, run_with_provider, JobRunner};
pub use retry::{retry_async, RetryConfig};
pub use settings::MotionSettings;
pub use upload::{MediaUploader, R2Uploader};
