//! Structured job logging.
//!
//! Every generation and pipeline run logs its lifecycle through a
//! [`JobLogger`] so lines carry the same `job_id`/`provider`/`operation`
//! fields regardless of where they are emitted.

use tracing::{error, info, warn, Span};
use vgen_models::JobId;

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    provider: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, provider: &str, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            provider: provider.to_string(),
            operation,
        }
    }

    /// Logger for work that has no provider job id yet (a pipeline run).
    pub fn for_run(run_id: &str, provider: &str, operation: &'static str) -> Self {
        Self {
            job_id: run_id.to_string(),
            provider: provider.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            provider = %self.provider,
            operation = self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            provider = %self.provider,
            operation = self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            provider = %self.provider,
            operation = self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            provider = %self.provider,
            operation = self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Span carrying the job fields, for instrumenting the whole run.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            provider = %self.provider,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_fields() {
        let job_id = JobId::from_string("req-42");
        let logger = JobLogger::new(&job_id, "fal", "generation");

        assert_eq!(logger.job_id(), "req-42");
        assert_eq!(logger.provider(), "fal");
    }
}
