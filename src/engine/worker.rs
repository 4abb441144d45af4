// src/engine/worker.rs

//! Executes one attempt of the current operation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::engine::WorkflowService;
use crate::errors::{Fault, Result, WorkflowError};
use crate::handler::{HandlerResult, OperationHandler};
use crate::model::{Action, OperationResult, OperationState, WorkflowInstance};
use crate::types::Properties;

/// Runs the handler of the current operation and translates its outcome
/// into an operation state.
///
/// The worker never computes a workflow state. Persisting the operation
/// start does adopt a state changed in the store since the job was claimed,
/// so a workflow suspended or stopped in that window is seen as such by the
/// handler and by the caller.
pub struct OperationWorker<'a> {
    handler: Arc<dyn OperationHandler>,
    service: &'a WorkflowService,
}

impl<'a> OperationWorker<'a> {
    pub fn new(handler: Arc<dyn OperationHandler>, service: &'a WorkflowService) -> Self {
        Self { handler, service }
    }

    /// Start or resume the current operation depending on its state.
    pub fn execute(
        &self,
        workflow: &mut WorkflowInstance,
        properties: Option<&Properties>,
    ) -> Result<Option<OperationResult>> {
        let position = self.begin(workflow)?;
        let operation = &workflow.operations[position];

        match operation.state {
            OperationState::Instantiated => self.start(workflow),
            OperationState::Paused => {
                let empty = Properties::new();
                self.resume(workflow, properties.unwrap_or(&empty))
            }
            other => Err(Fault::new(format!(
                "operation '{}' at position {} cannot be executed in state {other}",
                operation.template, operation.position
            ))
            .into()),
        }
    }

    pub fn start(&self, workflow: &mut WorkflowInstance) -> Result<Option<OperationResult>> {
        let position = self.begin(workflow)?;

        let skip = workflow
            .operation(position)
            .is_some_and(|op| !op.should_execute());
        if skip {
            info!(
                workflow = workflow.id,
                position,
                operation = %self.handler.id(),
                "execution conditions not met; skipping operation"
            );
            if let Some(op) = workflow.operation_mut(position) {
                op.set_state(OperationState::Skipped);
            }
            return Ok(Some(OperationResult::skip()));
        }

        self.mark_running(workflow, position)?;
        info!(
            workflow = workflow.id,
            position,
            operation = %self.handler.id(),
            "starting operation"
        );
        let outcome = self.handler.start(workflow);
        self.finish(workflow, position, outcome)
    }

    pub fn resume(
        &self,
        workflow: &mut WorkflowInstance,
        properties: &Properties,
    ) -> Result<Option<OperationResult>> {
        if !self.handler.capabilities().resumable {
            return Err(Fault::new(format!(
                "handler '{}' is not resumable",
                self.handler.id()
            ))
            .into());
        }

        let position = self.begin(workflow)?;
        self.mark_running(workflow, position)?;
        info!(
            workflow = workflow.id,
            position,
            operation = %self.handler.id(),
            "resuming operation"
        );
        let outcome = self.handler.resume(workflow, properties);
        self.finish(workflow, position, outcome)
    }

    /// End-of-life notification. Failures are logged only.
    pub fn destroy(&self, workflow: &WorkflowInstance) {
        if let Err(err) = self.handler.destroy(workflow) {
            warn!(
                workflow = workflow.id,
                operation = %self.handler.id(),
                error = %err,
                "operation cleanup failed"
            );
        }
    }

    /// Position of the current operation.
    fn begin(&self, workflow: &WorkflowInstance) -> Result<usize> {
        match workflow.current {
            Some(position) if position < workflow.operations.len() => Ok(position),
            _ => {
                Err(Fault::new(format!("workflow {} has no current operation", workflow.id)).into())
            }
        }
    }

    fn mark_running(&self, workflow: &mut WorkflowInstance, position: usize) -> Result<()> {
        if let Some(op) = workflow.operation_mut(position) {
            op.set_state(OperationState::Running);
            op.date_started = Some(Utc::now());
        }
        self.service.persist_operation_start(workflow)
    }

    fn finish(
        &self,
        workflow: &mut WorkflowInstance,
        position: usize,
        outcome: HandlerResult,
    ) -> Result<Option<OperationResult>> {
        let op = workflow
            .operation_mut(position)
            .ok_or_else(|| Fault::new(format!("operation at position {position} vanished")))?;

        match outcome {
            Ok(result) => {
                let action = result.as_ref().map_or(Action::Continue, |r| r.action);
                op.set_state(match action {
                    Action::Continue => OperationState::Succeeded,
                    Action::Pause => OperationState::Paused,
                    Action::Skip => OperationState::Skipped,
                });
                debug!(position, ?action, "operation returned");
                Ok(result)
            }
            Err(source) => {
                op.set_state(OperationState::Failed);
                Err(WorkflowError::OperationFailed {
                    position,
                    template: op.template.clone(),
                    source,
                })
            }
        }
    }
}
