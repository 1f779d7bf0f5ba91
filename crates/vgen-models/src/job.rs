//! Provider-owned generation jobs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::MediaLocator;

/// Job identifier. Opaque; assigned by the provider that owns the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (for providers without their own ids, and render jobs).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical job status. Every vendor vocabulary maps onto these four.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position in the lifecycle; transitions only move forward.
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One status poll answer from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: JobStatus,
    /// Native progress (0-100) when the vendor reports one
    pub progress: Option<u8>,
    /// Vendor error detail for failed jobs
    pub error: Option<String>,
}

impl StatusReport {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            progress: None,
            error: None,
        }
    }

    pub fn processing(progress: Option<u8>) -> Self {
        Self {
            status: JobStatus::Processing,
            progress: progress.map(|p| p.min(100)),
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            status: JobStatus::Completed,
            progress: Some(100),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of applying a status report to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status moved forward
    Advanced,
    /// Same status (progress may have changed)
    Unchanged,
    /// Report would move the job backward or out of a terminal state
    Rejected,
}

/// Client-side view of a job owned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub request_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_media: Option<MediaLocator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Advisory progress estimate (0-100), never decreases
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Track a freshly submitted job.
    pub fn new(request_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            request_id,
            status: JobStatus::Pending,
            result_media: None,
            error_detail: None,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a poll response. Terminal states are final.
    pub fn apply(&mut self, report: &StatusReport) -> Transition {
        if self.status.is_terminal() || report.status.rank() < self.status.rank() {
            return Transition::Rejected;
        }

        let transition = if report.status == self.status {
            Transition::Unchanged
        } else {
            Transition::Advanced
        };

        self.status = report.status;
        if let Some(progress) = report.progress {
            self.record_progress(progress);
        }
        if report.status == JobStatus::Failed {
            self.error_detail = Some(
                report
                    .error
                    .clone()
                    .unwrap_or_else(|| "Provider reported failure without detail".to_string()),
            );
        }
        self.updated_at = Utc::now();
        transition
    }

    /// Record a progress estimate; lower values are ignored.
    pub fn record_progress(&mut self, progress: u8) -> u8 {
        self.progress = self.progress.max(progress.min(100));
        self.progress
    }

    /// Attach the result media of a completed job.
    pub fn complete(&mut self, media: MediaLocator) {
        self.status = JobStatus::Completed;
        self.result_media = Some(media);
        self.progress = 100;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut job = GenerationJob::new(JobId::from_string("req-1"));
        assert_eq!(job.apply(&StatusReport::pending()), Transition::Unchanged);
        assert_eq!(
            job.apply(&StatusReport::processing(Some(40))),
            Transition::Advanced
        );
        assert_eq!(job.progress, 40);
        assert_eq!(job.apply(&StatusReport::completed()), Transition::Advanced);
        assert!(job.is_terminal());
    }

    #[test]
    fn test_never_moves_backward() {
        let mut job = GenerationJob::new(JobId::from_string("req-2"));
        job.apply(&StatusReport::processing(Some(70)));

        assert_eq!(job.apply(&StatusReport::pending()), Transition::Rejected);
        assert_eq!(job.status, JobStatus::Processing);

        job.apply(&StatusReport::processing(Some(30)));
        assert_eq!(job.progress, 70, "progress must stay monotonic");
    }

    #[test]
    fn test_terminal_is_final() {
        let mut job = GenerationJob::new(JobId::from_string("req-3"));
        job.apply(&StatusReport::failed("nsfw filter"));
        assert_eq!(job.error_detail.as_deref(), Some("nsfw filter"));

        assert_eq!(job.apply(&StatusReport::completed()), Transition::Rejected);
        assert_eq!(job.status, JobStatus::Failed);
    }
}
