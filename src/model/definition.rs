// src/model/definition.rs

use serde::{Deserialize, Serialize};

use crate::types::Properties;

/// Immutable template describing one step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Name of the handler that implements this step.
    pub template: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub configuration: Properties,

    /// Workflow whose operations replace the remainder of the list when this
    /// operation fails. Only honoured together with `fail_on_error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_handler_workflow: Option<String>,

    #[serde(default)]
    pub fail_on_error: bool,

    /// Run only if this evaluates to `true` after substitution.
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub execute_condition: Option<String>,

    /// Skip if this evaluates to `true` after substitution.
    #[serde(default, rename = "unless", skip_serializing_if = "Option::is_none")]
    pub skip_condition: Option<String>,
}

impl OperationDefinition {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            description: None,
            configuration: Properties::new(),
            exception_handler_workflow: None,
            fail_on_error: false,
            execute_condition: None,
            skip_condition: None,
        }
    }
}

/// Named, ordered list of operation templates.
///
/// In configuration files the id is the table key, so it defaults to empty
/// on deserialization and is filled in by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "operation")]
    pub operations: Vec<OperationDefinition>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            description: None,
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: OperationDefinition) -> Self {
        self.operations.push(operation);
        self
    }

    /// Ids of every workflow referenced as an exception handler.
    pub fn exception_handlers(&self) -> impl Iterator<Item = &str> {
        self.operations
            .iter()
            .filter_map(|op| op.exception_handler_workflow.as_deref())
    }
}
