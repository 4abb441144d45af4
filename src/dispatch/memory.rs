// src/dispatch/memory.rs

//! In-process job dispatcher.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::dispatch::{Job, JobDispatcher, JobOperation, JobStatus};
use crate::errors::{Result, WorkflowError};
use crate::types::JobId;

/// Keeps jobs in memory and announces every transition to `Queued` on an
/// unbounded channel, so the dispatch loop never has to poll.
#[derive(Debug)]
pub struct InMemoryDispatcher {
    jobs: Mutex<BTreeMap<JobId, Job>>,
    next_id: AtomicU64,
    max_load: usize,
    queued_tx: mpsc::UnboundedSender<JobId>,
    queued_rx: Mutex<Option<mpsc::UnboundedReceiver<JobId>>>,
}

impl InMemoryDispatcher {
    pub fn new(max_load: usize) -> Self {
        let (queued_tx, queued_rx) = mpsc::unbounded_channel();
        Self {
            jobs: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            max_load,
            queued_tx,
            queued_rx: Mutex::new(Some(queued_rx)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the receiving end of the queue notifications. Only the first
    /// caller gets it.
    pub fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<JobId>> {
        self.queued_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn notify_queued(&self, id: JobId) {
        trace!(job = id, "job queued");
        // Nobody listening is fine; the job stays claimable.
        let _ = self.queued_tx.send(id);
    }

    /// Move a queued job to `Running`. Returns `None` if the job is no longer
    /// queued, e.g. because it was deleted in the meantime.
    pub fn claim(&self, id: JobId) -> Result<Option<Job>> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(&id).ok_or(WorkflowError::JobNotFound(id))?;
        if job.status != JobStatus::Queued {
            debug!(job = id, status = %job.status, "job no longer queued; not claimed");
            return Ok(None);
        }
        job.status = JobStatus::Running;
        job.date_started = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    /// Queued jobs in creation order.
    pub fn queued_jobs(&self) -> Vec<Job> {
        self.lock()
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .cloned()
            .collect()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.lock().values().cloned().collect()
    }
}

impl Default for InMemoryDispatcher {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl JobDispatcher for InMemoryDispatcher {
    fn create_job(
        &self,
        job_type: &str,
        operation: JobOperation,
        arguments: Vec<String>,
        payload: Option<String>,
        queue: bool,
    ) -> Result<Job> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let job = Job {
            id,
            job_type: job_type.to_string(),
            operation,
            arguments,
            payload,
            status: if queue {
                JobStatus::Queued
            } else {
                JobStatus::Instantiated
            },
            date_created: now,
            date_queued: queue.then_some(now),
            date_started: None,
        };

        debug!(job = id, operation = %operation, queued = queue, "created job");
        self.lock().insert(id, job.clone());
        if queue {
            self.notify_queued(id);
        }
        Ok(job)
    }

    fn get_job(&self, id: JobId) -> Result<Job> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or(WorkflowError::JobNotFound(id))
    }

    fn update_job(&self, job: &Job) -> Result<Job> {
        let mut updated = job.clone();
        let newly_queued = {
            let mut jobs = self.lock();
            let stored = jobs.get_mut(&job.id).ok_or(WorkflowError::JobNotFound(job.id))?;
            let newly_queued =
                updated.status == JobStatus::Queued && stored.status != JobStatus::Queued;
            if newly_queued {
                updated.date_queued = Some(Utc::now());
            }
            *stored = updated.clone();
            newly_queued
        };

        if newly_queued {
            self.notify_queued(job.id);
        }
        Ok(updated)
    }

    fn count(
        &self,
        job_type: &str,
        operation: Option<JobOperation>,
        status: JobStatus,
    ) -> Result<usize> {
        Ok(self
            .lock()
            .values()
            .filter(|j| j.job_type == job_type && j.status == status)
            .filter(|j| operation.is_none_or(|op| j.operation == op))
            .count())
    }

    fn max_load(&self) -> Result<usize> {
        Ok(self.max_load)
    }
}
