//! Job submission and polling engine.
//!
//! Submits a request to its provider, then checks status on the provider's
//! fixed interval until a terminal state or the attempt cap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::watch;
use tracing::{debug, Instrument};
use vgen_models::{
    GenerationJob, GenerationProgress, GenerationRequest, JobId, JobStatus, MediaLocator,
    Transition,
};
use vgen_providers::{GenerationProvider, ProviderRegistry};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Metric names.
pub mod names {
    pub const GENERATION_JOBS_TOTAL: &str = "vgen_generation_jobs_total";
    pub const GENERATION_DURATION_SECONDS: &str = "vgen_generation_duration_seconds";
}

/// Highest estimate reported before the provider says the job is done.
const MAX_PENDING_PERCENT: u8 = 99;

/// Runs generation requests to completion.
#[derive(Clone, Debug)]
pub struct JobRunner {
    registry: Arc<ProviderRegistry>,
}

impl JobRunner {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Submit `request` and poll it until it completes, fails or runs out of attempts.
    ///
    /// `on_progress` receives advisory, non-decreasing estimates.
    pub async fn run_to_completion<F>(
        &self,
        request: &GenerationRequest,
        cancel_rx: Option<&watch::Receiver<bool>>,
        on_progress: F,
    ) -> WorkerResult<MediaLocator>
    where
        F: FnMut(GenerationProgress) + Send,
    {
        let provider = self.registry.get(&request.provider)?;
        run_with_provider(provider.as_ref(), request, cancel_rx, on_progress).await
    }
}

/// Submit and poll against an already resolved provider.
pub async fn run_with_provider<F>(
    provider: &dyn GenerationProvider,
    request: &GenerationRequest,
    cancel_rx: Option<&watch::Receiver<bool>>,
    on_progress: F,
) -> WorkerResult<MediaLocator>
where
    F: FnMut(GenerationProgress) + Send,
{
    let start = Instant::now();
    let key = provider.key().to_string();

    let result = submit_and_poll(provider, request, cancel_rx, on_progress).await;

    let outcome = match &result {
        Ok(_) => "completed",
        Err(WorkerError::GenerationFailed { .. }) => "failed",
        Err(WorkerError::GenerationTimeout { .. }) => "timeout",
        Err(WorkerError::Cancelled) => "cancelled",
        Err(_) => "error",
    };
    counter!(names::GENERATION_JOBS_TOTAL, "provider" => key.clone(), "outcome" => outcome)
        .increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, "provider" => key)
        .record(start.elapsed().as_secs_f64());

    result
}

async fn submit_and_poll<F>(
    provider: &dyn GenerationProvider,
    request: &GenerationRequest,
    cancel_rx: Option<&watch::Receiver<bool>>,
    mut on_progress: F,
) -> WorkerResult<MediaLocator>
where
    F: FnMut(GenerationProgress) + Send,
{
    if is_cancelled(cancel_rx) {
        return Err(WorkerError::Cancelled);
    }

    let job_id = provider.submit(request).await?;
    let logger = JobLogger::new(&job_id, provider.key(), "generation");
    let policy = provider.poll_policy();
    logger.log_start(&format!(
        "{} submitted, polling every {:?} up to {} times",
        provider.kind().as_str(),
        policy.interval,
        policy.max_attempts
    ));

    let mut job = GenerationJob::new(job_id.clone());
    let mut cancel_rx = cancel_rx.cloned();

    async {
        for attempt in 1..=policy.max_attempts {
            if is_cancelled(cancel_rx.as_ref()) {
                logger.log_warning("cancelled while polling");
                return Err(WorkerError::Cancelled);
            }

            let report = provider.check_status(&job_id).await?;
            if job.apply(&report) == Transition::Rejected {
                debug!(
                    current = %job.status,
                    reported = %report.status,
                    "Ignoring backward status transition"
                );
            }

            match job.status {
                JobStatus::Completed => {
                    let media = provider.get_result(&job_id).await?;
                    job.complete(media.clone());
                    on_progress(progress_of(&job, provider.key()));
                    logger.log_completion(&media.describe());
                    return Ok(media);
                }
                JobStatus::Failed => {
                    let detail = job
                        .error_detail
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string());
                    logger.log_error(&detail);
                    return Err(WorkerError::generation_failed(
                        provider.key(),
                        job_id.as_str(),
                        detail,
                    ));
                }
                JobStatus::Pending | JobStatus::Processing => {
                    let estimate = report
                        .progress
                        .unwrap_or_else(|| estimate_percent(attempt, policy.max_attempts));
                    job.record_progress(estimate.min(MAX_PENDING_PERCENT));
                    let mut progress = progress_of(&job, provider.key());
                    progress.percent = progress.percent.min(MAX_PENDING_PERCENT);
                    debug!(attempt, percent = progress.percent, status = %job.status, "Polled");
                    on_progress(progress);
                }
            }

            if attempt < policy.max_attempts
                && !sleep_or_cancel(policy.interval, cancel_rx.as_mut()).await
            {
                logger.log_warning("cancelled while waiting");
                return Err(WorkerError::Cancelled);
            }
        }

        logger.log_error(&format!(
            "no terminal state after {} checks ({:?})",
            policy.max_attempts,
            policy.budget()
        ));
        Err(WorkerError::GenerationTimeout {
            provider: provider.key().to_string(),
            job_id: job_id.to_string(),
            attempts: policy.max_attempts,
        })
    }
    .instrument(logger.span())
    .await
}

fn progress_of(job: &GenerationJob, provider: &str) -> GenerationProgress {
    GenerationProgress {
        job_id: job.request_id.clone(),
        provider: provider.to_string(),
        status: job.status,
        percent: job.progress,
    }
}

/// Percentage of the attempt budget used, for providers without native progress.
pub fn estimate_percent(attempt: u32, max_attempts: u32) -> u8 {
    if max_attempts == 0 {
        return 0;
    }
    let pct = (u64::from(attempt) * 100) / u64::from(max_attempts);
    pct.min(u64::from(MAX_PENDING_PERCENT)) as u8
}

pub(crate) fn is_cancelled(cancel_rx: Option<&watch::Receiver<bool>>) -> bool {
    cancel_rx.map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Sleep for `duration`. Returns `false` if cancellation fired first.
async fn sleep_or_cancel(duration: Duration, cancel_rx: Option<&mut watch::Receiver<bool>>) -> bool {
    let Some(rx) = cancel_rx else {
        tokio::time::sleep(duration).await;
        return true;
    };

    let cancelled = async {
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancelled => false,
    }
}

/// Provider job id carried by a generation error.
pub fn job_id_of(err: &WorkerError) -> Option<JobId> {
    match err {
        WorkerError::GenerationFailed { job_id, .. }
        | WorkerError::GenerationTimeout { job_id, .. } => Some(JobId::from_string(job_id.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_percent() {
        assert_eq!(estimate_percent(1, 120), 0);
        assert_eq!(estimate_percent(60, 120), 50);
        assert_eq!(estimate_percent(120, 120), 99);
        assert_eq!(estimate_percent(3, 0), 0);
    }

    #[test]
    fn test_job_id_of() {
        let err = WorkerError::generation_failed("fal", "req-1", "boom");
        assert_eq!(job_id_of(&err), Some(JobId::from_string("req-1")));
        assert_eq!(job_id_of(&WorkerError::Cancelled), None);
    }

    #[tokio::test]
    async fn test_sleep_or_cancel() {
        assert!(sleep_or_cancel(Duration::from_millis(1), None).await);

        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        assert!(!sleep_or_cancel(Duration::from_secs(30), Some(&mut rx)).await);
    }
}
