// src/dispatch/mod.rs

//! Job dispatch layer.
//!
//! Every request to start a workflow, run an operation or resume a paused
//! operation is wrapped in a [`Job`] with its own id and status. The
//! workflow service talks to the dispatch system through [`JobDispatcher`];
//! the dispatch side calls back into the service through [`JobProcessor`].
//!
//! - [`memory`] holds an in-process dispatcher that signals newly queued
//!   jobs over a channel.
//! - [`queue`] is the pure pending/deferred bookkeeping of the loop.
//! - [`runner`] is the async loop that claims queued jobs and runs them on
//!   the blocking pool.

pub mod job;
pub mod memory;
pub mod queue;
pub mod runner;

pub use job::{Job, JobOperation, JobStatus};
pub use memory::InMemoryDispatcher;
pub use queue::PendingJobs;
pub use runner::{DispatchEvent, DispatchHandle, DispatchLoop, DispatchOptions, DispatchSummary};

use crate::errors::Result;
use crate::types::JobId;

/// Job type used for every workflow job.
pub const JOB_TYPE: &str = "org.mediaflow.workflow";

/// Dispatch system as seen by the workflow service.
pub trait JobDispatcher: Send + Sync {
    /// Create a job. With `queue` set the job is immediately eligible for
    /// dispatch, otherwise it stays `Instantiated` until updated to `Queued`.
    fn create_job(
        &self,
        job_type: &str,
        operation: JobOperation,
        arguments: Vec<String>,
        payload: Option<String>,
        queue: bool,
    ) -> Result<Job>;

    fn get_job(&self, id: JobId) -> Result<Job>;

    /// Persist `job` and return the stored copy.
    fn update_job(&self, job: &Job) -> Result<Job>;

    /// Number of jobs of `job_type` in `status`, optionally restricted to one
    /// operation.
    fn count(
        &self,
        job_type: &str,
        operation: Option<JobOperation>,
        status: JobStatus,
    ) -> Result<usize>;

    /// Maximum number of jobs the cluster is willing to run concurrently.
    fn max_load(&self) -> Result<usize>;
}

/// Consumer of dispatched jobs.
pub trait JobProcessor: Send + Sync + 'static {
    /// Advisory admission check made before a queued job is claimed.
    fn is_ready_to_accept(&self, job: &Job) -> bool;

    /// Run a claimed job to completion. Blocking.
    fn process(&self, job: Job) -> Result<()>;
}
