// src/model/instance.rs

//! Durable workflow instance.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::definition::WorkflowDefinition;
use crate::model::media_package::MediaPackage;
use crate::model::operation::OperationInstance;
use crate::model::state::{OperationState, WorkflowState};
use crate::model::substitution::{substitute, substitute_values, SystemProperties};
use crate::types::{Properties, WorkflowId};

/// One execution of a [`WorkflowDefinition`] against one media package.
///
/// Operations are kept as a position-indexed vector. The definition is
/// materialized on creation because exception handling may extend the list
/// at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Equal to the id of the backing `START_WORKFLOW` job. Zero until the
    /// job exists.
    pub id: WorkflowId,
    pub definition_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<WorkflowId>,
    pub state: WorkflowState,
    pub media_package: MediaPackage,
    #[serde(default)]
    pub configuration: Properties,
    pub operations: Vec<OperationInstance>,
    /// Position of the current operation; `None` once the list is exhausted.
    #[serde(default)]
    pub current: Option<usize>,
    #[serde(default)]
    pub errors: Vec<String>,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    /// Build a fresh instance. Placeholders in operation configuration and
    /// conditions are resolved once, up front.
    pub fn from_definition(
        definition: &WorkflowDefinition,
        media_package: MediaPackage,
        parent_id: Option<WorkflowId>,
        properties: Properties,
        system: &SystemProperties,
    ) -> Self {
        let operations = definition
            .operations
            .iter()
            .enumerate()
            .map(|(position, op)| OperationInstance::from_definition(position, op))
            .collect::<Vec<_>>();
        let current = if operations.is_empty() { None } else { Some(0) };

        let mut instance = Self {
            id: 0,
            definition_id: definition.id.clone(),
            title: definition.title.clone(),
            description: definition.description.clone(),
            parent_id,
            state: WorkflowState::Instantiated,
            media_package,
            configuration: properties,
            operations,
            current,
            errors: Vec::new(),
            date_created: Utc::now(),
            date_completed: None,
        };
        instance.apply_configuration(system);
        instance
    }

    pub fn current_operation(&self) -> Option<&OperationInstance> {
        self.current.and_then(|i| self.operations.get(i))
    }

    pub fn current_operation_mut(&mut self) -> Option<&mut OperationInstance> {
        self.current.and_then(move |i| self.operations.get_mut(i))
    }

    pub fn operation(&self, position: usize) -> Option<&OperationInstance> {
        self.operations.get(position)
    }

    pub fn operation_mut(&mut self, position: usize) -> Option<&mut OperationInstance> {
        self.operations.get_mut(position)
    }

    /// Point the cursor at the first operation that has not reached a
    /// terminal state. A paused operation stays current. Returns `None` once
    /// every operation is done.
    pub fn advance(&mut self) -> Option<&OperationInstance> {
        self.current = self.operations.iter().position(|op| !op.state.is_terminal());
        self.current_operation()
    }

    /// Set the state. `date_completed` is kept only while the state is
    /// terminal.
    pub fn set_state(&mut self, state: WorkflowState) {
        self.state = state;
        if state.is_terminal() {
            self.date_completed.get_or_insert_with(Utc::now);
        } else {
            self.date_completed = None;
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Drop every operation after `position`.
    pub fn truncate_after(&mut self, position: usize) {
        self.operations.truncate(position + 1);
        if self.current.is_some_and(|i| i > position) {
            self.current = Some(position);
        }
    }

    /// Append the operations of `definition` to the end of the list.
    pub fn extend(&mut self, definition: &WorkflowDefinition, system: &SystemProperties) {
        let offset = self.operations.len();
        self.operations.extend(
            definition
                .operations
                .iter()
                .enumerate()
                .map(|(i, op)| OperationInstance::from_definition(offset + i, op)),
        );
        self.apply_configuration(system);
    }

    /// Re-run placeholder substitution over every operation against the
    /// current workflow configuration.
    pub fn apply_configuration(&mut self, system: &SystemProperties) {
        substitute_operations(&mut self.operations, &self.configuration, system);
    }

    /// Substitute `properties` (falling back to the workflow configuration)
    /// into every operation without storing them on the workflow.
    pub fn apply_properties(&mut self, properties: &Properties, system: &SystemProperties) {
        let mut merged = self.configuration.clone();
        merged.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        substitute_operations(&mut self.operations, &merged, system);
    }

    /// Whether any operation in the whole history failed while flagged to
    /// fail the workflow.
    pub fn has_flagged_failure(&self) -> bool {
        self.operations
            .iter()
            .any(|op| op.state == OperationState::Failed && op.fail_workflow_on_exception)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }
}

fn substitute_operations(
    operations: &mut [OperationInstance],
    properties: &Properties,
    system: &SystemProperties,
) {
    for op in operations {
        substitute_values(&mut op.configuration, properties, system);
        for condition in [&mut op.execute_condition, &mut op.skip_condition]
            .into_iter()
            .flatten()
        {
            if let Cow::Owned(replaced) = substitute(condition, properties, system) {
                *condition = replaced;
            }
        }
    }
}
