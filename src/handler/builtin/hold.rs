// src/handler/builtin/hold.rs

use std::collections::BTreeMap;

use tracing::info;

use crate::errors::OperationError;
use crate::handler::{HandlerCapabilities, HandlerResult, OperationHandler};
use crate::model::{OperationResult, WorkflowInstance};
use crate::types::Properties;

/// Pauses the workflow until an operator resumes it.
///
/// Resume properties are merged into the workflow configuration.
#[derive(Debug, Default)]
pub struct HoldHandler;

impl OperationHandler for HoldHandler {
    fn id(&self) -> &str {
        "hold"
    }

    fn description(&self) -> &str {
        "Holds the workflow for operator review"
    }

    fn configuration_options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("ui".to_string(), "Locator of the review UI".to_string()),
            (
                "allow-abort".to_string(),
                "Whether the operator may abort instead (default true)".to_string(),
            ),
        ])
    }

    fn capabilities(&self) -> HandlerCapabilities {
        HandlerCapabilities::HOLD
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult {
        let allow_abort = workflow
            .current_operation()
            .and_then(|op| op.config("allow-abort"))
            .is_none_or(|v| !v.trim().eq_ignore_ascii_case("false"));

        info!(workflow = workflow.id, "holding workflow for review");
        Ok(Some(
            OperationResult::pause().with_pause_controls(true, allow_abort),
        ))
    }

    fn resume(&self, workflow: &WorkflowInstance, properties: &Properties) -> HandlerResult {
        info!(
            workflow = workflow.id,
            properties = properties.len(),
            "hold released"
        );
        Ok(Some(
            OperationResult::proceed().with_properties(properties.clone()),
        ))
    }

    fn hold_state_ui(
        &self,
        workflow: &WorkflowInstance,
    ) -> Result<Option<String>, OperationError> {
        Ok(workflow
            .current_operation()
            .and_then(|op| op.config("ui"))
            .map(str::to_string))
    }

    fn hold_action_title(&self) -> Option<String> {
        Some("Continue".to_string())
    }
}
