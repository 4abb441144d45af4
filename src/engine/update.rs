// src/engine/update.rs

//! The single persistence path for workflow instances.

use tracing::{debug, trace};

use crate::dispatch::JobStatus;
use crate::engine::WorkflowService;
use crate::errors::Result;
use crate::model::{WorkflowInstance, WorkflowState};

/// Status the backing workflow job takes for a workflow state. `None` leaves
/// the job status untouched.
pub fn job_status_for(state: WorkflowState) -> Option<JobStatus> {
    match state {
        WorkflowState::Instantiated => Some(JobStatus::Queued),
        WorkflowState::Running => Some(JobStatus::Running),
        WorkflowState::Paused => Some(JobStatus::Paused),
        WorkflowState::Succeeded => Some(JobStatus::Finished),
        WorkflowState::Failing => None,
        WorkflowState::Failed => Some(JobStatus::Failed),
        WorkflowState::Stopped => Some(JobStatus::Deleted),
    }
}

impl WorkflowService {
    /// Persist `workflow`.
    ///
    /// In order:
    /// 1. fill unset media package metadata from the metadata providers
    /// 2. serialize the instance into the payload of its workflow job and
    ///    sync the job status from the workflow state
    /// 3. write the store, then the job (a job becoming `Queued` here is
    ///    picked up by the dispatch loop, which must see the stored state)
    /// 4. notify listeners if the state or the current operation changed
    pub fn update(&self, workflow: &mut WorkflowInstance) -> Result<()> {
        let previous = self.store.get(workflow.id)?;

        self.metadata.populate(&mut workflow.media_package);

        let mut job = self.dispatcher.get_job(workflow.id)?;
        job.payload = Some(serde_json::to_string(workflow)?);
        if let Some(status) = job_status_for(workflow.state) {
            job.status = status;
        }

        self.store.update(workflow)?;
        self.dispatcher.update_job(&job)?;

        trace!(
            workflow = workflow.id,
            state = %workflow.state,
            job_status = %job.status,
            "workflow persisted"
        );

        self.listeners.notify(previous.as_ref(), workflow);
        Ok(())
    }

    /// Persist a workflow whose current operation is about to call its
    /// handler. A state changed in the store by someone else in the
    /// meantime is adopted rather than overwritten.
    pub(crate) fn persist_operation_start(&self, workflow: &mut WorkflowInstance) -> Result<()> {
        if let Some(stored) = self.store.get(workflow.id)? {
            if stored.state != workflow.state {
                debug!(
                    workflow = workflow.id,
                    local = %workflow.state,
                    stored = %stored.state,
                    "adopting externally changed workflow state"
                );
                workflow.state = stored.state;
            }
        }
        self.update(workflow)
    }
}
