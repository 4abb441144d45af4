// src/dispatch/runner.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dispatch::queue::PendingJobs;
use crate::dispatch::{InMemoryDispatcher, Job, JobDispatcher, JobProcessor, JobStatus};
use crate::errors::{Result, WorkflowError};
use crate::types::JobId;

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Maximum number of jobs processed at the same time.
    pub workers: usize,
    /// How long a job refused by admission control waits before it is
    /// offered again, unless another job completes first.
    pub retry_interval: Duration,
    /// Stop once nothing is queued, deferred or running.
    pub exit_when_idle: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            retry_interval: Duration::from_millis(250),
            exit_when_idle: false,
        }
    }
}

/// How a processed job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Processed,
    Failed { message: String, fatal: bool },
}

/// Events flowing into the dispatch loop besides queue notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    JobCompleted { job: JobId, outcome: JobOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C). Jobs already running are
    /// not interrupted.
    ShutdownRequested,
}

/// Cloneable handle used to stop a running [`DispatchLoop`].
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<DispatchEvent>,
}

impl DispatchHandle {
    pub async fn shutdown(&self) {
        let _ = self.tx.send(DispatchEvent::ShutdownRequested).await;
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub processed: usize,
    pub failed: usize,
    /// Times a job was refused by admission control.
    pub deferred: usize,
}

/// Pulls queued jobs from an [`InMemoryDispatcher`] and runs them through a
/// [`JobProcessor`] on Tokio's blocking pool.
///
/// The loop reacts to:
/// - queue notifications from the dispatcher
/// - job completions from its own workers
/// - the retry timer, armed only while jobs are deferred
/// - shutdown requests
pub struct DispatchLoop<P: JobProcessor> {
    dispatcher: Arc<InMemoryDispatcher>,
    processor: Arc<P>,
    queued_rx: mpsc::UnboundedReceiver<JobId>,
    event_tx: mpsc::Sender<DispatchEvent>,
    event_rx: mpsc::Receiver<DispatchEvent>,
    jobs: PendingJobs,
    in_flight: usize,
    options: DispatchOptions,
    summary: DispatchSummary,
}

impl<P: JobProcessor> fmt::Debug for DispatchLoop<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchLoop")
            .field("jobs", &self.jobs)
            .field("in_flight", &self.in_flight)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<P: JobProcessor> DispatchLoop<P> {
    /// Attach a loop to `dispatcher`. Fails if another loop already
    /// subscribed to its queue notifications.
    pub fn new(
        dispatcher: Arc<InMemoryDispatcher>,
        processor: Arc<P>,
        options: DispatchOptions,
    ) -> Result<Self> {
        let queued_rx = dispatcher.subscribe().ok_or_else(|| {
            WorkflowError::IllegalState("dispatcher is already attached to a dispatch loop".into())
        })?;
        let (event_tx, event_rx) = mpsc::channel(64);

        Ok(Self {
            dispatcher,
            processor,
            queued_rx,
            event_tx,
            event_rx,
            jobs: PendingJobs::new(),
            in_flight: 0,
            options: DispatchOptions {
                workers: options.workers.max(1),
                ..options
            },
            summary: DispatchSummary::default(),
        })
    }

    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            tx: self.event_tx.clone(),
        }
    }

    /// Main loop.
    pub async fn run(mut self) -> Result<DispatchSummary> {
        info!(workers = self.options.workers, "dispatch loop started");

        loop {
            while let Ok(id) = self.queued_rx.try_recv() {
                self.jobs.push(id);
            }
            self.dispatch_ready();

            if self.options.exit_when_idle && self.in_flight == 0 && self.jobs.is_empty() {
                info!("no queued or running jobs left; stopping dispatch loop");
                break;
            }

            let retry_armed = self.jobs.has_deferred();
            tokio::select! {
                Some(id) = self.queued_rx.recv() => {
                    self.jobs.push(id);
                }
                Some(event) = self.event_rx.recv() => {
                    if !self.handle_event(event) {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.options.retry_interval), if retry_armed => {
                    self.jobs.retry_deferred();
                }
                else => break,
            }
        }

        info!(
            processed = self.summary.processed,
            failed = self.summary.failed,
            in_flight = self.in_flight,
            "dispatch loop exiting"
        );
        Ok(self.summary)
    }

    /// Claim and start pending jobs while workers are free.
    fn dispatch_ready(&mut self) {
        while self.in_flight < self.options.workers {
            let Some(id) = self.jobs.pop() else {
                break;
            };

            let job = match self.dispatcher.get_job(id) {
                Ok(job) => job,
                Err(err) => {
                    warn!(job = id, error = %err, "queued job disappeared");
                    continue;
                }
            };

            if job.status != JobStatus::Queued {
                debug!(job = id, status = %job.status, "skipping job that is no longer queued");
                continue;
            }

            if !self.processor.is_ready_to_accept(&job) {
                debug!(job = id, operation = %job.operation, "job refused; deferring");
                self.summary.deferred += 1;
                self.jobs.defer(id);
                continue;
            }

            match self.dispatcher.claim(id) {
                Ok(Some(job)) => self.spawn(job),
                Ok(None) => {}
                Err(err) => warn!(job = id, error = %err, "failed to claim job"),
            }
        }
    }

    fn spawn(&mut self, job: Job) {
        let id = job.id;
        debug!(job = id, operation = %job.operation, "dispatching job");

        let processor = Arc::clone(&self.processor);
        let tx = self.event_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(move || processor.process(job)).await {
                Ok(Ok(())) => JobOutcome::Processed,
                Ok(Err(err)) => JobOutcome::Failed {
                    fatal: err.is_fatal(),
                    message: err.to_string(),
                },
                Err(join_err) => JobOutcome::Failed {
                    fatal: true,
                    message: format!("job worker panicked: {join_err}"),
                },
            };
            let _ = tx.send(DispatchEvent::JobCompleted { job: id, outcome }).await;
        });
    }

    /// Returns false when the loop should stop.
    fn handle_event(&mut self, event: DispatchEvent) -> bool {
        match event {
            DispatchEvent::JobCompleted { job, outcome } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match outcome {
                    JobOutcome::Processed => {
                        self.summary.processed += 1;
                        debug!(job, "job processed");
                    }
                    JobOutcome::Failed { message, fatal } => {
                        self.summary.failed += 1;
                        error!(job, fatal, error = %message, "job failed");
                        self.mark_failed(job);
                    }
                }
                self.jobs.retry_deferred();
                true
            }
            DispatchEvent::ShutdownRequested => {
                info!(in_flight = self.in_flight, "shutdown requested");
                false
            }
        }
    }

    fn mark_failed(&self, id: JobId) {
        let mut job = match self.dispatcher.get_job(id) {
            Ok(job) => job,
            Err(err) => {
                warn!(job = id, error = %err, "cannot mark missing job as failed");
                return;
            }
        };
        if job.status.is_terminal() {
            return;
        }
        job.status = JobStatus::Failed;
        if let Err(err) = self.dispatcher.update_job(&job) {
            warn!(job = id, error = %err, "failed to mark job as failed");
        }
    }
}
