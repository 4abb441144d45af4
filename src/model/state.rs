// src/model/state.rs

//! Workflow, operation and handler-action enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Instantiated,
    Running,
    Paused,
    Succeeded,
    /// Working off an exception-handling workflow after a flagged failure.
    Failing,
    Failed,
    Stopped,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 7] = [
        WorkflowState::Instantiated,
        WorkflowState::Running,
        WorkflowState::Paused,
        WorkflowState::Succeeded,
        WorkflowState::Failing,
        WorkflowState::Failed,
        WorkflowState::Stopped,
    ];

    /// No further operation is dispatched once a workflow is in one of these
    /// states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Succeeded | WorkflowState::Failed | WorkflowState::Stopped
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Instantiated => "INSTANTIATED",
            WorkflowState::Running => "RUNNING",
            WorkflowState::Paused => "PAUSED",
            WorkflowState::Succeeded => "SUCCEEDED",
            WorkflowState::Failing => "FAILING",
            WorkflowState::Failed => "FAILED",
            WorkflowState::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a single operation within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Instantiated,
    Running,
    Paused,
    Succeeded,
    Failed,
    Skipped,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Succeeded | OperationState::Failed | OperationState::Skipped
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::Instantiated => "INSTANTIATED",
            OperationState::Running => "RUNNING",
            OperationState::Paused => "PAUSED",
            OperationState::Succeeded => "SUCCEEDED",
            OperationState::Failed => "FAILED",
            OperationState::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// What the workflow should do after a handler returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    Continue,
    Pause,
    Skip,
}
