//! Progress reporting types.

use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

/// Poll progress for one generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub job_id: JobId,
    pub provider: String,
    pub status: JobStatus,
    /// Advisory estimate, 0-100
    pub percent: u8,
}

/// Events emitted by the scene motion pipeline.
///
/// `index` is zero-based; [`PipelineEvent::message`] renders it one-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Started {
        total: usize,
    },
    SceneStarted {
        index: usize,
        total: usize,
        scene_id: String,
    },
    SceneProgress {
        index: usize,
        total: usize,
        scene_id: String,
        status: JobStatus,
        percent: u8,
    },
    SceneSkipped {
        index: usize,
        total: usize,
        scene_id: String,
    },
    SceneCompleted {
        index: usize,
        total: usize,
        scene_id: String,
    },
    SceneFailed {
        index: usize,
        total: usize,
        scene_id: String,
        error: String,
    },
    Finished {
        total: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        cancelled: bool,
    },
}

impl PipelineEvent {
    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            PipelineEvent::Started { total } => format!("Animating {} scenes", total),
            PipelineEvent::SceneStarted { index, total, .. } => {
                format!("Scene {}/{}: submitting", index + 1, total)
            }
            PipelineEvent::SceneProgress {
                index,
                total,
                status,
                percent,
                ..
            } => format!("Scene {}/{}: {} ({}%)", index + 1, total, status, percent),
            PipelineEvent::SceneSkipped { index, total, .. } => {
                format!("Scene {}/{}: already animated", index + 1, total)
            }
            PipelineEvent::SceneCompleted { index, total, .. } => {
                format!("Scene {}/{}: done", index + 1, total)
            }
            PipelineEvent::SceneFailed {
                index,
                total,
                error,
                ..
            } => format!("Scene {}/{}: failed ({})", index + 1, total, error),
            PipelineEvent::Finished {
                total,
                succeeded,
                failed,
                cancelled,
                ..
            } => {
                if *cancelled {
                    format!("Cancelled after {} of {} scenes", succeeded + failed, total)
                } else {
                    format!("Finished: {} animated, {} failed", succeeded, failed)
                }
            }
        }
    }
}
