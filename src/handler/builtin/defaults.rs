// src/handler/builtin/defaults.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::handler::{HandlerResult, OperationHandler};
use crate::model::{OperationResult, WorkflowInstance};
use crate::types::Properties;

/// Copies its configuration into the workflow properties, leaving keys the
/// caller already set untouched.
#[derive(Debug, Default)]
pub struct DefaultsHandler;

impl OperationHandler for DefaultsHandler {
    fn id(&self) -> &str {
        "defaults"
    }

    fn description(&self) -> &str {
        "Applies default values for workflow properties"
    }

    fn configuration_options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            "*".to_string(),
            "Any key; becomes a workflow property unless already set".to_string(),
        )])
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult {
        let Some(operation) = workflow.current_operation() else {
            return Ok(None);
        };

        let defaults: Properties = operation
            .configuration
            .iter()
            .filter(|(key, _)| !workflow.configuration.contains_key(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        debug!(
            workflow = workflow.id,
            applied = defaults.len(),
            "applying workflow defaults"
        );

        Ok(Some(OperationResult::proceed().with_properties(defaults)))
    }
}
