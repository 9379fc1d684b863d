//! SQLite job store

use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePool;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(JobState::Waiting),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            "delayed" => Some(JobState::Delayed),
            _ => None,
        }
    }
}

/// A job row materialized from the store.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub queue: String,
    pub job_type: String,
    /// JSON-encoded payload
    pub payload: String,
    pub state: JobState,
    /// Processing attempts started so far (incremented on claim)
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    /// JSON result recorded on completion
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Per-state job counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
}

/// Durable store shared by all queues. One `jobs` table partitioned by
/// queue name; claim is a single UPDATE so concurrent consumers can
/// never take the same job.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the jobs table if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue TEXT NOT NULL,
                job_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'waiting',
                attempts_made INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL,
                last_error TEXT,
                result TEXT,
                run_at TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_queue_state ON jobs (queue, state, id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a new waiting job, returning its id.
    pub async fn append(
        &self,
        queue: &str,
        job_type: &str,
        payload: &str,
        max_attempts: u32,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (queue, job_type, payload, state, max_attempts, created_at)
            VALUES (?, ?, ?, 'waiting', ?, ?)
            "#,
        )
        .bind(queue)
        .bind(job_type)
        .bind(payload)
        .bind(max_attempts as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Atomically claim the oldest runnable job (waiting, or delayed
    /// with an elapsed run_at). Returns None when the queue is drained.
    pub async fn claim_next(&self, queue: &str) -> Result<Option<Job>> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET state = 'active',
                attempts_made = attempts_made + 1,
                started_at = ?1
            WHERE id = (
                SELECT id FROM jobs
                WHERE queue = ?2
                  AND (state = 'waiting' OR (state = 'delayed' AND run_at <= ?1))
                ORDER BY id
                LIMIT 1
            )
            RETURNING id, queue, job_type, payload, state, attempts_made, max_attempts,
                      last_error, result, created_at, started_at, finished_at
            "#,
        )
        .bind(&now)
        .bind(queue)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id = row.id;
        match row.try_into() {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                // The row is already active at this point and can never
                // decode, so it goes straight to terminal failure.
                tracing::error!(queue, job_id = id, error = %e, "claimed job row failed to decode");
                self.mark_failed_terminal(id, &format!("undecodable job row: {e}"))
                    .await?;
                Ok(None)
            }
        }
    }

    /// Record a successful run and its JSON result.
    pub async fn mark_completed(&self, id: i64, result: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'completed', result = ?, finished_at = ?
            WHERE id = ?
            "#,
        )
        .bind(result)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed run. Jobs with attempts left go back through
    /// `delayed` with exponential backoff (base * 2^(attempt-1)),
    /// otherwise they land in terminal `failed`. Returns the resulting
    /// state.
    pub async fn mark_failed(
        &self,
        id: i64,
        attempts_made: u32,
        max_attempts: u32,
        error: &str,
        backoff_base_ms: u64,
    ) -> Result<JobState> {
        if attempts_made < max_attempts {
            let backoff = backoff_base_ms.saturating_mul(1u64 << (attempts_made.saturating_sub(1)).min(20));
            let run_at = Utc::now() + Duration::milliseconds(backoff as i64);
            sqlx::query(
                r#"
                UPDATE jobs
                SET state = 'delayed', last_error = ?, run_at = ?
                WHERE id = ?
                "#,
            )
            .bind(error)
            .bind(run_at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
            Ok(JobState::Delayed)
        } else {
            self.mark_failed_terminal(id, error).await?;
            Ok(JobState::Failed)
        }
    }

    /// Fail a job with no retry, regardless of attempts left. Used for
    /// errors that cannot succeed on retry (e.g. unknown job type).
    pub async fn mark_failed_terminal(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'failed', last_error = ?, finished_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Per-state counts for a queue.
    pub async fn counts(&self, queue: &str) -> Result<QueueCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT state, COUNT(*) FROM jobs WHERE queue = ? GROUP BY state",
        )
        .bind(queue)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = QueueCounts::default();
        for (state, count) in rows {
            let count = count as u64;
            match JobState::parse(&state) {
                Some(JobState::Waiting) => counts.waiting = count,
                Some(JobState::Active) => counts.active = count,
                Some(JobState::Completed) => counts.completed = count,
                Some(JobState::Failed) => counts.failed = count,
                Some(JobState::Delayed) => counts.delayed = count,
                None => {}
            }
        }
        Ok(counts)
    }

    /// All jobs currently in the active state.
    pub async fn active_jobs(&self, queue: &str) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, queue, job_type, payload, state, attempts_made, max_attempts,
                   last_error, result, created_at, started_at, finished_at
            FROM jobs
            WHERE queue = ? AND state = 'active'
            ORDER BY id
            "#,
        )
        .bind(queue)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(|r| r.try_into().ok()).collect())
    }

    /// Fetch one job by id.
    pub async fn get(&self, id: i64) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, queue, job_type, payload, state, attempts_made, max_attempts,
                   last_error, result, created_at, started_at, finished_at
            FROM jobs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| r.try_into().ok()))
    }

    /// Remove a job outright. Returns whether a row was deleted, so
    /// removal is idempotent.
    pub async fn remove(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop completed/failed jobs beyond the newest `keep_completed` /
    /// `keep_failed` rows. Returns the number of rows removed.
    pub async fn prune(
        &self,
        queue: &str,
        keep_completed: u64,
        keep_failed: u64,
    ) -> Result<u64> {
        let mut removed = 0u64;
        for (state, keep) in [("completed", keep_completed), ("failed", keep_failed)] {
            let result = sqlx::query(
                r#"
                DELETE FROM jobs
                WHERE queue = ?1 AND state = ?2 AND id NOT IN (
                    SELECT id FROM jobs
                    WHERE queue = ?1 AND state = ?2
                    ORDER BY id DESC
                    LIMIT ?3
                )
                "#,
            )
            .bind(queue)
            .bind(state)
            .bind(keep as i64)
            .execute(&self.pool)
            .await?;
            removed += result.rows_affected();
        }
        Ok(removed)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    queue: String,
    job_type: String,
    payload: String,
    state: String,
    attempts_made: i64,
    max_attempts: i64,
    last_error: Option<String>,
    result: Option<String>,
    created_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> std::result::Result<Self, Self::Error> {
        let state = JobState::parse(&row.state)
            .ok_or_else(|| anyhow::anyhow!("unknown job state: {}", row.state))?;
        let parse_ts = |s: &str| -> std::result::Result<DateTime<Utc>, Self::Error> {
            Ok(s.parse::<DateTime<Utc>>()?)
        };
        Ok(Job {
            id: row.id,
            queue: row.queue,
            job_type: row.job_type,
            payload: row.payload,
            state,
            attempts_made: row.attempts_made as u32,
            max_attempts: row.max_attempts as u32,
            last_error: row.last_error,
            result: row.result,
            created_at: parse_ts(&row.created_at)?,
            started_at: row.started_at.as_deref().map(parse_ts).transpose()?,
            finished_at: row.finished_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}
