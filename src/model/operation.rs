// src/model/operation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::definition::OperationDefinition;
use crate::model::state::OperationState;
use crate::types::{JobId, Properties};

/// Materialized operation inside a workflow instance.
///
/// Identity is `position`. The value is cloned and serialized freely, so
/// callers re-resolve an operation by position instead of holding on to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInstance {
    pub position: usize,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub state: OperationState,
    #[serde(default)]
    pub configuration: Properties,
    #[serde(default)]
    pub fail_workflow_on_exception: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_handler_workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_condition: Option<String>,

    /// Dispatch job backing this operation. Assigned when the operation is
    /// queued, never before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_state_ui: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_action_title: Option<String>,
    #[serde(default)]
    pub continuable: bool,
    #[serde(default)]
    pub abortable: bool,

    /// Milliseconds the backing job waited before it was picked up.
    #[serde(default)]
    pub time_in_queue: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime<Utc>>,
}

impl OperationInstance {
    pub fn from_definition(position: usize, definition: &OperationDefinition) -> Self {
        Self {
            position,
            template: definition.template.clone(),
            description: definition.description.clone(),
            state: OperationState::Instantiated,
            configuration: definition.configuration.clone(),
            fail_workflow_on_exception: definition.fail_on_error,
            exception_handler_workflow: definition.exception_handler_workflow.clone(),
            execute_condition: definition.execute_condition.clone(),
            skip_condition: definition.skip_condition.clone(),
            job_id: None,
            hold_state_ui: None,
            hold_action_title: None,
            continuable: false,
            abortable: false,
            time_in_queue: 0,
            date_started: None,
            date_completed: None,
        }
    }

    pub fn config(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }

    /// Set the state and keep the completion timestamp and hold fields
    /// consistent with it.
    pub fn set_state(&mut self, state: OperationState) {
        self.state = state;
        if state.is_terminal() {
            self.date_completed = Some(Utc::now());
        }
        if state != OperationState::Paused {
            self.hold_state_ui = None;
            self.hold_action_title = None;
            self.continuable = false;
            self.abortable = false;
        }
    }

    /// Whether the execution conditions allow this operation to run.
    ///
    /// Conditions are expected to be substituted already; anything other
    /// than a case-insensitive `true` counts as false.
    pub fn should_execute(&self) -> bool {
        let truthy = |s: &str| s.trim().eq_ignore_ascii_case("true");
        let execute = self.execute_condition.as_deref().is_none_or(truthy);
        let skip = self.skip_condition.as_deref().is_some_and(truthy);
        execute && !skip
    }
}
