// src/engine/execution.rs

//! Running the current operation and applying its outcome.

use tracing::{debug, error, info, warn};

use crate::dispatch::{Job, JobOperation, JobStatus, JOB_TYPE};
use crate::engine::{OperationWorker, WorkflowService};
use crate::errors::{Fault, OperationError, Result, WorkflowError};
use crate::handler::OperationHandler;
use crate::model::{Action, OperationResult, OperationState, WorkflowInstance, WorkflowState};
use crate::types::{Properties, WorkflowId};

impl WorkflowService {
    /// Execute the current operation of `workflow` and move the workflow on.
    ///
    /// 1. snapshot the workflow state
    /// 2. resolve the handler and run the worker (start or resume)
    /// 3. re-resolve the executed operation by position
    /// 4. sync the operation job from the operation state
    /// 5. advance the cursor; an exhausted list finalizes the workflow
    /// 6. otherwise re-read the stored state, let an external change win
    ///    over a computed RUNNING or FAILING (and STOPPED over a computed
    ///    PAUSED), and queue the next operation if the workflow is still
    ///    running. A computed FAILED is always kept.
    ///
    /// Workflows already SUCCEEDED, FAILED or STOPPED in the store are
    /// returned unchanged.
    pub fn run_workflow_operation(
        &self,
        workflow: WorkflowInstance,
        properties: Option<&Properties>,
    ) -> Result<WorkflowInstance> {
        let stored = self.get_workflow(workflow.id)?;
        if stored.state.is_terminal() {
            debug!(
                workflow = workflow.id,
                state = %stored.state,
                "workflow already finished; not running operation"
            );
            return Ok(stored);
        }

        let mut workflow = workflow;
        let initial_state = workflow.state;
        let (position, template) = workflow
            .current_operation()
            .map(|op| (op.position, op.template.clone()))
            .ok_or_else(|| no_current_operation(workflow.id))?;

        let Some(handler) = self.handlers.resolve(&template) else {
            error!(
                workflow = workflow.id,
                position,
                operation = %template,
                "no handler for operation"
            );
            if let Some(op) = workflow.operation_mut(position) {
                op.set_state(OperationState::Failed);
            }
            workflow.add_error(format!("no handler registered for operation '{template}'"));
            workflow.set_state(WorkflowState::Failed);
            self.sync_operation_job(&workflow, position)?;
            self.update(&mut workflow)?;
            return Ok(workflow);
        };

        let worker = OperationWorker::new(handler.clone(), self);
        let applied = match worker.execute(&mut workflow, properties) {
            Ok(result) => {
                let action = result.as_ref().map_or(Action::Continue, |r| r.action);
                let applied =
                    self.handle_operation_result(&mut workflow, result, handler.as_ref());
                if applied.is_ok() && action == Action::Continue {
                    worker.destroy(&workflow);
                }
                applied
            }
            Err(WorkflowError::OperationFailed {
                position: failed,
                template,
                source,
            }) => {
                warn!(
                    workflow = workflow.id,
                    position = failed,
                    operation = %template,
                    error = %source,
                    "operation failed"
                );
                self.handle_operation_exception(&mut workflow, failed, &source)
            }
            Err(err) => Err(err),
        };

        if let Err(err) = applied {
            if err.is_fatal() {
                self.fail_after_fault(&mut workflow, position, &err);
            }
            return Err(err);
        }

        self.sync_operation_job(&workflow, position)?;

        if workflow.advance().is_none() {
            self.finish_workflow(&mut workflow, initial_state)?;
            return Ok(workflow);
        }

        let stored_state = self.get_workflow(workflow.id)?.state;
        if stored_state != initial_state && yields_to_external(workflow.state, stored_state) {
            info!(
                workflow = workflow.id,
                computed = %workflow.state,
                stored = %stored_state,
                "workflow state changed externally; keeping the external state"
            );
            workflow.set_state(stored_state);
        }

        match workflow.state {
            WorkflowState::Failed
            | WorkflowState::Paused
            | WorkflowState::Stopped
            | WorkflowState::Succeeded => self.update(&mut workflow)?,
            WorkflowState::Running | WorkflowState::Failing => {
                self.queue_current_operation(&mut workflow)?;
            }
            WorkflowState::Instantiated => {
                self.update(&mut workflow)?;
                return Err(Fault::new(format!(
                    "workflow {} is still instantiated after running an operation",
                    workflow.id
                ))
                .into());
            }
        }

        Ok(workflow)
    }

    /// Apply a handler result to the operation at the cursor.
    ///
    /// `None` counts as CONTINUE without changes. A PAUSE from a handler
    /// that is not resumable is a fault.
    pub fn handle_operation_result(
        &self,
        workflow: &mut WorkflowInstance,
        result: Option<OperationResult>,
        handler: &dyn OperationHandler,
    ) -> Result<()> {
        let result = result.unwrap_or_else(OperationResult::proceed);

        if let Some(media_package) = result.media_package {
            workflow.media_package = media_package;
        }
        if !result.properties.is_empty() {
            workflow.configuration.extend(result.properties);
            workflow.apply_configuration(&self.options.system);
        }

        // Re-resolve by position after the merge.
        let position = workflow
            .current
            .ok_or_else(|| no_current_operation(workflow.id))?;

        let capabilities = handler.capabilities();
        let hold_ui = if result.action == Action::Pause && capabilities.hold_ui {
            match handler.hold_state_ui(workflow) {
                Ok(ui) => ui,
                Err(err) => {
                    warn!(
                        workflow = workflow.id,
                        position,
                        error = %err,
                        "cannot determine hold state UI; pausing without it"
                    );
                    None
                }
            }
        } else {
            None
        };

        let op = workflow
            .operation_mut(position)
            .ok_or_else(|| Fault::new(format!("operation at position {position} vanished")))?;
        op.time_in_queue = op.time_in_queue.saturating_add(result.time_in_queue);

        match result.action {
            Action::Continue => op.set_state(OperationState::Succeeded),
            Action::Skip => op.set_state(OperationState::Skipped),
            Action::Pause => {
                if !capabilities.resumable {
                    return Err(Fault::new(format!(
                        "operation '{}' paused but handler '{}' is not resumable",
                        op.template,
                        handler.id()
                    ))
                    .into());
                }
                op.set_state(OperationState::Paused);
                op.continuable = result.allow_continue;
                op.abortable = result.allow_abort;
                if capabilities.hold_ui {
                    op.hold_state_ui = hold_ui;
                    op.hold_action_title = handler.hold_action_title();
                }
                info!(workflow = workflow.id, position, "operation paused");
                workflow.set_state(WorkflowState::Paused);
            }
        }
        Ok(())
    }

    /// Record a handler failure on the operation at `position`.
    ///
    /// An operation flagged to fail the workflow either hands over to its
    /// exception handler workflow, whose operations replace the rest of the
    /// list while the workflow goes FAILING, or fails the workflow right
    /// away and leaves the remaining operations unattempted. Unflagged
    /// failures let the workflow continue.
    pub fn handle_operation_exception(
        &self,
        workflow: &mut WorkflowInstance,
        position: usize,
        failure: &OperationError,
    ) -> Result<()> {
        workflow.add_error(failure.message());

        let op = workflow
            .operation_mut(position)
            .ok_or_else(|| Fault::new(format!("operation at position {position} vanished")))?;
        op.set_state(OperationState::Failed);

        if !op.fail_workflow_on_exception {
            return Ok(());
        }

        let handler_workflow = op
            .exception_handler_workflow
            .clone()
            .filter(|id| !id.trim().is_empty());

        match handler_workflow {
            Some(id) => {
                let definition = self.definitions.get(&id).ok_or_else(|| {
                    Fault::new(format!("exception handler workflow '{id}' is not registered"))
                })?;
                workflow.truncate_after(position);
                info!(
                    workflow = workflow.id,
                    position,
                    exception_handler = %id,
                    "running exception handler workflow"
                );
                workflow.extend(&definition, &self.options.system);
                workflow.set_state(WorkflowState::Failing);
            }
            None => workflow.set_state(WorkflowState::Failed),
        }
        Ok(())
    }

    /// Finalize a workflow whose operation list is exhausted.
    fn finish_workflow(
        &self,
        workflow: &mut WorkflowInstance,
        initial_state: WorkflowState,
    ) -> Result<()> {
        let stored_state = self.get_workflow(workflow.id)?.state;

        let final_state = if stored_state == WorkflowState::Stopped
            && initial_state != WorkflowState::Stopped
        {
            WorkflowState::Stopped
        } else {
            match workflow.state {
                WorkflowState::Failing => WorkflowState::Failed,
                WorkflowState::Failed => WorkflowState::Failed,
                // Failures flagged anywhere in the history win, including
                // those inside an exception handler workflow.
                _ if workflow.has_flagged_failure() => WorkflowState::Failed,
                _ => WorkflowState::Succeeded,
            }
        };

        info!(workflow = workflow.id, state = %final_state, "workflow finished");
        workflow.set_state(final_state);
        self.update(workflow)
    }

    /// Sync the job of the operation at `position` with its state.
    pub(crate) fn sync_operation_job(
        &self,
        workflow: &WorkflowInstance,
        position: usize,
    ) -> Result<()> {
        let op = workflow
            .operation(position)
            .ok_or_else(|| Fault::new(format!("operation at position {position} vanished")))?;
        let job_id = op.job_id.ok_or_else(|| {
            Fault::new(format!(
                "operation '{}' at position {position} has no job",
                op.template
            ))
        })?;

        let mut job = self.dispatcher.get_job(job_id)?;
        if job.status == JobStatus::Deleted {
            return Ok(());
        }

        match op.state {
            OperationState::Failed => job.status = JobStatus::Failed,
            OperationState::Paused => {
                job.status = JobStatus::Paused;
                job.operation = JobOperation::Resume;
            }
            OperationState::Succeeded | OperationState::Skipped => {
                job.status = JobStatus::Finished;
            }
            state @ (OperationState::Instantiated | OperationState::Running) => {
                return Err(Fault::new(format!(
                    "operation '{}' at position {position} is still {state} after execution",
                    op.template
                ))
                .into());
            }
        }
        self.dispatcher.update_job(&job)?;
        Ok(())
    }

    /// Create a job for the current operation, persist the workflow with the
    /// job id, then queue the job.
    pub(crate) fn queue_current_operation(&self, workflow: &mut WorkflowInstance) -> Result<()> {
        let job = self.create_operation_job(workflow)?;
        let id = workflow.id;
        let op = workflow
            .current_operation_mut()
            .ok_or_else(|| no_current_operation(id))?;
        op.job_id = Some(job.id);
        debug!(
            workflow = id,
            position = op.position,
            job = job.id,
            "queueing operation"
        );

        self.update(workflow)?;
        self.queue_job(job)
    }

    fn create_operation_job(&self, workflow: &WorkflowInstance) -> Result<Job> {
        self.dispatcher.create_job(
            JOB_TYPE,
            JobOperation::StartOperation,
            vec![workflow.id.to_string()],
            None,
            false,
        )
    }

    pub(crate) fn queue_job(&self, mut job: Job) -> Result<()> {
        job.status = JobStatus::Queued;
        self.dispatcher.update_job(&job)?;
        Ok(())
    }

    /// After a fault, mark the operation and the workflow FAILED so the
    /// failure is visible in the store. Best effort.
    fn fail_after_fault(
        &self,
        workflow: &mut WorkflowInstance,
        position: usize,
        err: &WorkflowError,
    ) {
        if let Some(op) = workflow.operation_mut(position) {
            op.set_state(OperationState::Failed);
        }
        workflow.add_error(err.to_string());
        workflow.set_state(WorkflowState::Failed);

        if let Err(sync_err) = self.sync_operation_job(workflow, position) {
            warn!(
                workflow = workflow.id,
                error = %sync_err,
                "failed to sync operation job after fault"
            );
        }
        if let Err(update_err) = self.update(workflow) {
            warn!(
                workflow = workflow.id,
                error = %update_err,
                "failed to persist workflow after fault"
            );
        }
    }
}

/// Whether a locally computed state gives way to a different stored one.
fn yields_to_external(computed: WorkflowState, stored: WorkflowState) -> bool {
    match computed {
        WorkflowState::Running | WorkflowState::Failing => true,
        WorkflowState::Paused => stored == WorkflowState::Stopped,
        _ => false,
    }
}

fn no_current_operation(workflow: WorkflowId) -> Fault {
    Fault::new(format!("workflow {workflow} has no current operation"))
}
