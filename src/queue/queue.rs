//! Typed named queue facade

use super::store::{JobStore, QueueCounts};
use super::JobPayload;
use crate::error::Result;
use chrono::Utc;
use std::marker::PhantomData;
use std::time::Duration;

/// Tunables shared by a queue and its worker.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Attempts per job before terminal failure
    pub max_attempts: u32,
    /// Exponential backoff base between attempts
    pub backoff_base_ms: u64,
    /// Completed jobs retained after pruning
    pub keep_completed: u64,
    /// Failed jobs retained after pruning
    pub keep_failed: u64,
    /// Worker poll interval when the queue is drained
    pub poll_interval_ms: u64,
    /// Age past which an active job counts as stale
    pub stale_timeout_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 2000,
            keep_completed: 300,
            keep_failed: 300,
            poll_interval_ms: 500,
            stale_timeout_ms: 60_000,
        }
    }
}

/// Producer-side handle for one named queue.
pub struct JobQueue<P: JobPayload> {
    store: JobStore,
    settings: QueueSettings,
    _payload: PhantomData<fn() -> P>,
}

impl<P: JobPayload> JobQueue<P> {
    pub fn new(store: JobStore, settings: QueueSettings) -> Self {
        Self {
            store,
            settings,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        P::QUEUE
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Enqueue a job. Never fails toward the caller: on any error the
    /// problem is logged and None comes back, so producers keep going.
    pub async fn add_job(&self, payload: &P) -> Option<i64> {
        let encoded = match serde_json::to_string(payload) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(queue = P::QUEUE, error = %e, "failed to encode job payload");
                return None;
            }
        };

        match self
            .store
            .append(P::QUEUE, payload.job_type(), &encoded, self.settings.max_attempts)
            .await
        {
            Ok(id) => {
                tracing::debug!(queue = P::QUEUE, job_id = id, job_type = payload.job_type(), "job added");
                Some(id)
            }
            Err(e) => {
                tracing::error!(queue = P::QUEUE, error = %e, "failed to add job");
                None
            }
        }
    }

    /// Per-state counts for this queue.
    pub async fn counts(&self) -> Result<QueueCounts> {
        self.store.counts(P::QUEUE).await
    }

    /// Remove active jobs whose processing started longer than
    /// `stale_timeout` ago. Jobs within the window stay untouched, so a
    /// second sweep right after is a no-op. Returns how many were
    /// removed.
    pub async fn clean_stale_jobs(&self, stale_timeout: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::milliseconds(stale_timeout.as_millis().min(i64::MAX as u128) as i64);
        let mut removed = 0usize;

        for job in self.store.active_jobs(P::QUEUE).await? {
            let Some(started_at) = job.started_at else {
                continue;
            };
            if started_at <= cutoff && self.store.remove(job.id).await? {
                tracing::warn!(
                    queue = P::QUEUE,
                    job_id = job.id,
                    job_type = %job.job_type,
                    started_at = %started_at,
                    "removed stale active job"
                );
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(queue = P::QUEUE, removed, "stale job sweep finished");
        }
        Ok(removed)
    }

    /// Apply the retention policy.
    pub async fn prune(&self) -> Result<u64> {
        self.store
            .prune(P::QUEUE, self.settings.keep_completed, self.settings.keep_failed)
            .await
    }
}
