//! Shared data models for the vgen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Media locators (remote URLs, inline data URIs, local files)
//! - Generation requests and provider-owned jobs
//! - Scenes and their per-track media state
//! - Batch results and render requests
//! - Pipeline progress events

pub mod batch;
pub mod generation;
pub mod job;
pub mod locator;
pub mod progress;
pub mod render;
pub mod scene;
pub mod style;

// Re-export common types
pub use batch::{BatchItemResult, BatchResult};
pub use generation::{GenerationKind, GenerationRequest};
pub use job::{GenerationJob, JobId, JobStatus, StatusReport, Transition};
pub use locator::{LocatorError, MediaLocator};
pub use progress::{GenerationProgress, PipelineEvent};
pub use render::{RenderRequest, RenderResponse, RenderScene};
pub use scene::{find_scene, MediaState, Scene, SceneStatus};
pub use style::{AspectRatio, AspectRatioParseError, DurationCategory, MotionType};
