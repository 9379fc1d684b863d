//! Single-consumer queue worker

use super::store::{Job, JobState, JobStore};
use super::{JobPayload, QueueSettings};
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Processes one decoded job payload.
#[async_trait::async_trait]
pub trait JobHandler<P: JobPayload>: Send + Sync {
    /// Handle a job, returning a JSON result recorded on the job row.
    async fn handle(&self, payload: P, job: &Job) -> Result<serde_json::Value>;
}

/// Polling worker with concurrency 1: at most one job of its queue is
/// in flight at any time, and jobs complete in claim order.
pub struct Worker<P: JobPayload> {
    store: JobStore,
    settings: QueueSettings,
    handler: Arc<dyn JobHandler<P>>,
    running: AtomicBool,
}

impl<P: JobPayload> Worker<P> {
    pub fn new(store: JobStore, settings: QueueSettings, handler: Arc<dyn JobHandler<P>>) -> Self {
        Self {
            store,
            settings,
            handler,
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the processing loop. Calling start on an already running
    /// worker logs a warning and does nothing.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!(queue = P::QUEUE, "worker already started");
            return;
        }
        tracing::info!(queue = P::QUEUE, "worker started");

        let worker = Arc::clone(self);
        tokio::spawn(async move {
            worker.run_loop().await;
        });
    }

    /// Ask the loop to stop after the job in flight (if any) finishes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run_loop(&self) {
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);
        while self.running.load(Ordering::SeqCst) {
            match self.store.claim_next(P::QUEUE).await {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => tokio::time::sleep(poll_interval).await,
                Err(e) => {
                    tracing::error!(queue = P::QUEUE, error = %e, "failed to claim job");
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
        tracing::info!(queue = P::QUEUE, "worker stopped");
    }

    /// Process one claimed job end to end. A failing job never takes
    /// the loop down with it.
    async fn process(&self, job: Job) {
        tracing::info!(
            queue = P::QUEUE,
            job_id = job.id,
            job_type = %job.job_type,
            attempt = job.attempts_made,
            "job active"
        );

        let payload: P = match serde_json::from_str(&job.payload) {
            Ok(payload) => payload,
            Err(e) => {
                // Unknown tag or malformed payload, neither can succeed
                // on retry.
                let message =
                    format!("failed to decode payload for job type '{}': {}", job.job_type, e);
                tracing::error!(queue = P::QUEUE, job_id = job.id, "{}", message);
                if let Err(e) = self.store.mark_failed_terminal(job.id, &message).await {
                    tracing::error!(queue = P::QUEUE, job_id = job.id, error = %e, "failed to record job failure");
                }
                return;
            }
        };

        match self.handler.handle(payload, &job).await {
            Ok(result) => {
                let encoded = result.to_string();
                if let Err(e) = self.store.mark_completed(job.id, &encoded).await {
                    tracing::error!(queue = P::QUEUE, job_id = job.id, error = %e, "failed to record job completion");
                    return;
                }
                tracing::info!(queue = P::QUEUE, job_id = job.id, "job completed");

                if let Err(e) = self
                    .store
                    .prune(P::QUEUE, self.settings.keep_completed, self.settings.keep_failed)
                    .await
                {
                    tracing::warn!(queue = P::QUEUE, error = %e, "retention prune failed");
                }
            }
            Err(e) => {
                let message = e.to_string();
                match self
                    .store
                    .mark_failed(
                        job.id,
                        job.attempts_made,
                        job.max_attempts,
                        &message,
                        self.settings.backoff_base_ms,
                    )
                    .await
                {
                    Ok(JobState::Delayed) => {
                        tracing::warn!(
                            queue = P::QUEUE,
                            job_id = job.id,
                            attempt = job.attempts_made,
                            max_attempts = job.max_attempts,
                            error = %message,
                            "job failed, will retry"
                        );
                    }
                    Ok(_) => {
                        tracing::error!(
                            queue = P::QUEUE,
                            job_id = job.id,
                            attempts = job.attempts_made,
                            error = %message,
                            "job failed permanently"
                        );
                    }
                    Err(e) => {
                        tracing::error!(queue = P::QUEUE, job_id = job.id, error = %e, "failed to record job failure");
                    }
                }
            }
        }
    }
}
