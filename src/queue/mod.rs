//! Durable job queues
//!
//! SQLite-backed queues with at-least-once delivery: jobs are appended
//! as `waiting`, claimed atomically into `active` by a single-consumer
//! worker, and either completed or retried with exponential backoff
//! through the `delayed` state until attempts run out.

pub mod queue;
pub mod store;
pub mod worker;


pub use queue::{JobQueue, QueueSettings};
pub use store::{Job, JobState, JobStore, QueueCounts};
pub use worker::{JobHandler, Worker};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Payload of a job on a named queue. Implementations are closed serde
/// tagged unions, so routing on job type is checked at compile time and
/// an unrecognized tag surfaces as a deserialization error for that job
/// alone.
pub trait JobPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Queue this payload type belongs to.
    const QUEUE: &'static str;

    /// Type tag recorded on the job row.
    fn job_type(&self) -> &'static str;
}
