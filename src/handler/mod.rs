// src/handler/mod.rs

//! Pluggable operation handlers.
//!
//! A handler implements the behaviour of one operation template. Optional
//! behaviour is advertised through [`HandlerCapabilities`] and checked by the
//! orchestrator before use:
//! - `resumable`: the handler may return [`Action::Pause`](crate::model::Action)
//!   and implements [`OperationHandler::resume`].
//! - `hold_ui`: the handler provides a hold-state UI locator and action title
//!   while paused.

use std::collections::BTreeMap;

use crate::errors::OperationError;
use crate::model::{OperationResult, WorkflowInstance};
use crate::types::Properties;

pub mod builtin;

/// Optional handler features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerCapabilities {
    pub resumable: bool,
    pub hold_ui: bool,
}

impl HandlerCapabilities {
    pub const NONE: HandlerCapabilities = HandlerCapabilities {
        resumable: false,
        hold_ui: false,
    };

    pub const RESUMABLE: HandlerCapabilities = HandlerCapabilities {
        resumable: true,
        hold_ui: false,
    };

    pub const HOLD: HandlerCapabilities = HandlerCapabilities {
        resumable: true,
        hold_ui: true,
    };
}

/// Result type returned by handler entry points.
pub type HandlerResult = std::result::Result<Option<OperationResult>, OperationError>;

/// Behaviour of one operation template.
///
/// Every call receives a snapshot of the workflow with the operation being
/// executed as its current operation. Calls are synchronous and may block.
pub trait OperationHandler: Send + Sync {
    /// Template name this handler is registered under.
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Configuration keys understood by this handler, with a description.
    /// Informational only.
    fn configuration_options(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn capabilities(&self) -> HandlerCapabilities {
        HandlerCapabilities::NONE
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult;

    /// Continue a paused operation. Only called when `capabilities().resumable`.
    fn resume(&self, workflow: &WorkflowInstance, properties: &Properties) -> HandlerResult {
        let _ = (workflow, properties);
        Err(OperationError::new(format!(
            "operation '{}' cannot be resumed",
            self.id()
        )))
    }

    /// End-of-life notification after the operation completed with CONTINUE.
    fn destroy(&self, workflow: &WorkflowInstance) -> std::result::Result<(), OperationError> {
        let _ = workflow;
        Ok(())
    }

    /// Locator of the UI an operator uses to act on a paused operation.
    fn hold_state_ui(
        &self,
        workflow: &WorkflowInstance,
    ) -> std::result::Result<Option<String>, OperationError> {
        let _ = workflow;
        Ok(None)
    }

    /// Label for the action that resumes a paused operation.
    fn hold_action_title(&self) -> Option<String> {
        None
    }
}

/// Documentation entry for a registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub id: String,
    pub description: String,
    pub configuration_options: BTreeMap<String, String>,
    pub capabilities: HandlerCapabilities,
}

impl HandlerInfo {
    pub fn of(handler: &dyn OperationHandler) -> Self {
        Self {
            id: handler.id().to_string(),
            description: handler.description().to_string(),
            configuration_options: handler.configuration_options(),
            capabilities: handler.capabilities(),
        }
    }
}
