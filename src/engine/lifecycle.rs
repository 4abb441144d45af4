// src/engine/lifecycle.rs

//! Workflow lifecycle transitions and the dispatch entry point.

use tracing::{debug, error, info, warn};

use crate::dispatch::{Job, JobOperation, JobStatus, JOB_TYPE};
use crate::engine::WorkflowService;
use crate::errors::{Fault, Result, WorkflowError};
use crate::model::{
    MediaPackage, OperationState, WorkflowDefinition, WorkflowInstance, WorkflowState,
};
use crate::types::{Properties, WorkflowId};

impl WorkflowService {
    /// Create a workflow instance and queue its `START_WORKFLOW` job.
    ///
    /// The returned instance carries the job id as its id. If anything fails
    /// after validation, the instance is marked FAILED and persisted on a
    /// best-effort basis; the original error is returned.
    pub fn start(
        &self,
        definition: &WorkflowDefinition,
        media_package: MediaPackage,
        parent_id: Option<WorkflowId>,
        properties: Properties,
    ) -> Result<WorkflowInstance> {
        if definition.operations.is_empty() {
            return Err(WorkflowError::InvalidDefinition(format!(
                "workflow definition '{}' has no operations",
                definition.id
            )));
        }
        if media_package.identifier.trim().is_empty() {
            return Err(WorkflowError::InvalidMediaPackage(
                "media package has no identifier".to_string(),
            ));
        }
        if let Some(parent) = parent_id {
            self.get_workflow(parent)?;
        }

        let mut workflow = WorkflowInstance::from_definition(
            definition,
            media_package,
            parent_id,
            properties.clone(),
            &self.options.system,
        );

        match self.create_workflow_job(&mut workflow, &properties) {
            Ok(()) => {
                info!(
                    workflow = workflow.id,
                    definition = %definition.id,
                    media_package = %workflow.media_package.identifier,
                    "workflow created"
                );
                Ok(workflow)
            }
            Err(err) => {
                error!(definition = %definition.id, error = %err, "failed to start workflow");
                workflow.add_error(err.to_string());
                workflow.set_state(WorkflowState::Failed);
                if let Err(secondary) = self.update(&mut workflow) {
                    warn!(
                        workflow = workflow.id,
                        error = %secondary,
                        "could not mark workflow as failed"
                    );
                }
                Err(err)
            }
        }
    }

    fn create_workflow_job(
        &self,
        workflow: &mut WorkflowInstance,
        properties: &Properties,
    ) -> Result<()> {
        let arguments = vec![
            workflow.definition_id.clone(),
            workflow.parent_id.map(|p| p.to_string()).unwrap_or_default(),
            serde_json::to_string(properties)?,
        ];
        let payload = serde_json::to_string(workflow)?;

        let job = self.dispatcher.create_job(
            JOB_TYPE,
            JobOperation::StartWorkflow,
            arguments,
            Some(payload),
            false,
        )?;
        workflow.id = job.id;

        // INSTANTIATED maps to a queued job.
        self.update(workflow)
    }

    /// Begin executing an instantiated workflow by queueing its first
    /// operation.
    pub fn run_workflow(&self, workflow: WorkflowInstance) -> Result<WorkflowInstance> {
        let mut workflow = workflow;
        if workflow.state != WorkflowState::Instantiated {
            return Err(WorkflowError::IllegalState(format!(
                "workflow {} cannot be run from state {}",
                workflow.id, workflow.state
            )));
        }

        match workflow.current_operation().map(|op| op.position) {
            Some(0) => {}
            other => {
                return Err(Fault::new(format!(
                    "workflow {} must start at position 0, cursor is {other:?}",
                    workflow.id
                ))
                .into());
            }
        }

        info!(workflow = workflow.id, "running workflow");
        workflow.set_state(WorkflowState::Running);
        self.update(&mut workflow)?;
        self.queue_current_operation(&mut workflow)?;
        Ok(workflow)
    }

    /// Continue a paused workflow.
    ///
    /// - exhausted operation list: finalize as SUCCEEDED, or FAILED if a
    ///   flagged failure exists
    /// - current operation not dispatched yet: queue a fresh operation job
    ///   and set the workflow RUNNING
    /// - current operation paused: requeue its job with `properties`
    ///   appended; the workflow goes RUNNING once the job is processed. A
    ///   job that is already queued or running again is an `IllegalState`.
    pub fn resume(&self, id: WorkflowId, properties: Properties) -> Result<WorkflowInstance> {
        let mut workflow = self.get_workflow(id)?;
        if workflow.state != WorkflowState::Paused {
            return Err(WorkflowError::IllegalState(format!(
                "workflow {id} is {}; only paused workflows can be resumed",
                workflow.state
            )));
        }

        self.ensure_not_resuming(&workflow)?;

        workflow.apply_properties(&properties, &self.options.system);
        self.update(&mut workflow)?;

        let Some(operation) = workflow.current_operation() else {
            let state = if workflow.has_flagged_failure() {
                WorkflowState::Failed
            } else {
                WorkflowState::Succeeded
            };
            info!(workflow = id, state = %state, "resumed workflow has no operations left");
            workflow.set_state(state);
            self.update(&mut workflow)?;
            return Ok(workflow);
        };
        let position = operation.position;

        match operation.state {
            OperationState::Instantiated => {
                let pending = match operation.job_id {
                    Some(job_id) => self.dispatcher.get_job(job_id)?.status == JobStatus::Queued,
                    None => false,
                };
                workflow.set_state(WorkflowState::Running);
                info!(workflow = id, position, "resuming workflow");
                if pending {
                    self.update(&mut workflow)?;
                } else {
                    self.queue_current_operation(&mut workflow)?;
                }
                Ok(workflow)
            }
            OperationState::Paused => {
                let job_id = operation.job_id.ok_or_else(|| {
                    Fault::new(format!(
                        "paused operation at position {position} of workflow {id} has no job"
                    ))
                })?;

                let mut operation_job = self.dispatcher.get_job(job_id)?;
                let mut workflow_job = self.dispatcher.get_job(id)?;
                workflow_job.status = JobStatus::Running;
                self.dispatcher.update_job(&workflow_job)?;

                operation_job.arguments.push(serde_json::to_string(&properties)?);
                operation_job.status = JobStatus::Queued;
                self.dispatcher.update_job(&operation_job)?;

                info!(workflow = id, position, job = job_id, "resuming paused operation");
                Ok(workflow)
            }
            other => Err(WorkflowError::IllegalState(format!(
                "workflow {id} cannot be resumed while its current operation is {other}"
            ))),
        }
    }

    /// Reject a resume racing an earlier one: the paused operation's job
    /// must still be PAUSED, not queued or claimed again.
    fn ensure_not_resuming(&self, workflow: &WorkflowInstance) -> Result<()> {
        let Some(op) = workflow.current_operation() else {
            return Ok(());
        };
        let status = match (op.state, op.job_id) {
            (OperationState::Running, _) => None,
            (OperationState::Paused, Some(job_id)) => {
                let status = self.dispatcher.get_job(job_id)?.status;
                if status == JobStatus::Paused {
                    return Ok(());
                }
                Some(status)
            }
            _ => return Ok(()),
        };
        Err(WorkflowError::IllegalState(match status {
            Some(status) => format!(
                "workflow {} is already being resumed (operation job is {status})",
                workflow.id
            ),
            None => format!(
                "workflow {} cannot be resumed while its current operation is running",
                workflow.id
            ),
        }))
    }

    /// Stop a workflow immediately. Running handlers are not interrupted;
    /// their results are reconciled against the STOPPED state.
    pub fn stop(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        let mut workflow = self.get_workflow(id)?;
        match workflow.state {
            WorkflowState::Stopped => return Ok(workflow),
            state @ (WorkflowState::Succeeded | WorkflowState::Failed) => {
                return Err(WorkflowError::IllegalState(format!(
                    "workflow {id} is already {state}"
                )));
            }
            _ => {}
        }

        workflow.set_state(WorkflowState::Stopped);
        self.update(&mut workflow)?;

        if let Some(job_id) = workflow.current_operation().and_then(|op| op.job_id) {
            let mut job = self.dispatcher.get_job(job_id)?;
            if matches!(
                job.status,
                JobStatus::Instantiated | JobStatus::Queued | JobStatus::Paused
            ) {
                job.status = JobStatus::Deleted;
                self.dispatcher.update_job(&job)?;
            }
        }

        info!(workflow = id, "workflow stopped");
        Ok(workflow)
    }

    /// Pause a workflow from the outside. The current operation is not
    /// interrupted; no further operation is queued until [`Self::resume`].
    pub fn suspend(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        let mut workflow = self.get_workflow(id)?;
        if workflow.state.is_terminal() {
            return Err(WorkflowError::IllegalState(format!(
                "workflow {id} is already {}",
                workflow.state
            )));
        }
        if workflow.state == WorkflowState::Paused {
            return Ok(workflow);
        }

        workflow.set_state(WorkflowState::Paused);
        self.update(&mut workflow)?;
        info!(workflow = id, "workflow suspended");
        Ok(workflow)
    }

    /// Remove a finished workflow from the store.
    pub fn remove(&self, id: WorkflowId) -> Result<()> {
        let workflow = self.get_workflow(id)?;
        if !workflow.state.is_terminal() {
            return Err(WorkflowError::IllegalState(format!(
                "workflow {id} is {} and cannot be removed",
                workflow.state
            )));
        }
        self.store.remove(id)?;
        debug!(workflow = id, "workflow removed");
        Ok(())
    }

    /// Run a job claimed by the dispatch layer.
    pub fn process(&self, job: Job) -> Result<()> {
        debug!(job = job.id, operation = %job.operation, "processing job");
        match job.operation {
            JobOperation::StartWorkflow => {
                let payload = job.payload.as_deref().ok_or_else(|| {
                    Fault::new(format!("start workflow job {} has no payload", job.id))
                })?;
                let workflow: WorkflowInstance = serde_json::from_str(payload)?;
                self.run_workflow(workflow)?;
            }
            JobOperation::StartOperation => {
                let mut workflow = self.workflow_for_job(&job)?;
                record_queue_time(&mut workflow, &job);
                self.run_workflow_operation(workflow, None)?;
            }
            JobOperation::Resume => {
                let mut workflow = self.workflow_for_job(&job)?;
                if workflow.state.is_terminal() {
                    debug!(workflow = workflow.id, "ignoring resume of finished workflow");
                    return Ok(());
                }
                let properties: Properties = match job.arguments.get(1..) {
                    Some([.., last]) => serde_json::from_str(last)?,
                    _ => Properties::new(),
                };
                record_queue_time(&mut workflow, &job);
                workflow.set_state(WorkflowState::Running);
                self.update(&mut workflow)?;
                self.run_workflow_operation(workflow, Some(&properties))?;
            }
        }
        Ok(())
    }

    fn workflow_for_job(&self, job: &Job) -> Result<WorkflowInstance> {
        let id = job.workflow_id().ok_or_else(|| {
            Fault::new(format!("job {} does not reference a workflow", job.id))
        })?;
        self.get_workflow(id)
    }
}

/// Add the time `job` spent queued to the current operation.
fn record_queue_time(workflow: &mut WorkflowInstance, job: &Job) {
    if let Some(op) = workflow.current_operation_mut() {
        op.time_in_queue = op.time_in_queue.saturating_add(job.queue_time_ms());
    }
}
