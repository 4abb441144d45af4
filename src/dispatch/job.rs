// src/dispatch/job.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{JobId, WorkflowId};

/// What a job asks the workflow service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOperation {
    StartWorkflow,
    StartOperation,
    Resume,
}

impl fmt::Display for JobOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobOperation::StartWorkflow => "START_WORKFLOW",
            JobOperation::StartOperation => "START_OPERATION",
            JobOperation::Resume => "RESUME",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created but not yet handed to the dispatch loop.
    Instantiated,
    Queued,
    Running,
    Paused,
    Finished,
    Failed,
    Deleted,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed | JobStatus::Deleted)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Instantiated => "INSTANTIATED",
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Paused => "PAUSED",
            JobStatus::Finished => "FINISHED",
            JobStatus::Failed => "FAILED",
            JobStatus::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// One queueable unit of work.
///
/// Argument layout:
/// - `START_WORKFLOW`: definition id, parent id (empty if none), properties
///   as JSON. The payload carries the serialized instance.
/// - `START_OPERATION` / `RESUME`: workflow id; a `RESUME` job additionally
///   carries the resume properties as JSON in its last argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub operation: JobOperation,
    pub arguments: Vec<String>,
    pub payload: Option<String>,
    pub status: JobStatus,
    pub date_created: DateTime<Utc>,
    pub date_queued: Option<DateTime<Utc>>,
    pub date_started: Option<DateTime<Utc>>,
}

impl Job {
    /// Workflow id for operation-level jobs, the job's own id otherwise.
    pub fn workflow_id(&self) -> Option<WorkflowId> {
        match self.operation {
            JobOperation::StartWorkflow => Some(self.id),
            JobOperation::StartOperation | JobOperation::Resume => {
                self.arguments.first().and_then(|a| a.parse().ok())
            }
        }
    }

    /// Milliseconds between queueing and the latest start.
    pub fn queue_time_ms(&self) -> u64 {
        match (self.date_queued, self.date_started) {
            (Some(queued), Some(started)) => {
                u64::try_from((started - queued).num_milliseconds()).unwrap_or(0)
            }
            _ => 0,
        }
    }
}
