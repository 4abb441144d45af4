// src/registry/handlers.rs

//! Operation handler lookup by template name.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::errors::{Result, WorkflowError};
use crate::handler::{HandlerInfo, OperationHandler};
use crate::model::WorkflowDefinition;
use crate::registry::DefinitionRegistry;

/// Handlers keyed by the template name they implement.
///
/// At most one handler per name; a second registration is an error rather
/// than a silent replacement.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<BTreeMap<String, Arc<dyn OperationHandler>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operations", &self.operation_names())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn OperationHandler>) -> Result<()> {
        let name = handler.id().to_string();
        let mut map = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&name) {
            return Err(WorkflowError::DuplicateHandler(name));
        }
        debug!(operation = %name, "registered operation handler");
        map.insert(name, handler);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn OperationHandler>> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn OperationHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Sorted list of template names that have a handler.
    pub fn operation_names(&self) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|h| HandlerInfo::of(h.as_ref()))
            .collect()
    }

    /// Whether every operation of `definition`, and of every exception
    /// handler workflow it references (transitively), has a handler.
    pub fn is_runnable(
        &self,
        definition: &WorkflowDefinition,
        definitions: &DefinitionRegistry,
    ) -> bool {
        let mut visited = HashSet::new();
        self.is_runnable_inner(definition, definitions, &mut visited)
    }

    fn is_runnable_inner(
        &self,
        definition: &WorkflowDefinition,
        definitions: &DefinitionRegistry,
        visited: &mut HashSet<String>,
    ) -> bool {
        if !visited.insert(definition.id.clone()) {
            return true;
        }

        for op in &definition.operations {
            if self.resolve(&op.template).is_none() {
                warn!(
                    definition = %definition.id,
                    operation = %op.template,
                    "no handler registered for operation"
                );
                return false;
            }

            if let Some(handler_id) = op.exception_handler_workflow.as_deref() {
                let Some(handler_def) = definitions.get(handler_id) else {
                    warn!(
                        definition = %definition.id,
                        exception_handler = %handler_id,
                        "exception handler workflow is not registered"
                    );
                    return false;
                };
                if !self.is_runnable_inner(&handler_def, definitions, visited) {
                    return false;
                }
            }
        }
        true
    }
}
