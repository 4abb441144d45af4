// src/registry/definitions.rs

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::errors::{Result, WorkflowError};
use crate::model::WorkflowDefinition;

/// Workflow definitions keyed by id.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: RwLock<BTreeMap<String, Arc<WorkflowDefinition>>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Blank and already registered ids are rejected.
    pub fn register(&self, definition: WorkflowDefinition) -> Result<()> {
        if definition.id.trim().is_empty() {
            return Err(WorkflowError::InvalidDefinition(
                "workflow definition must have an id".to_string(),
            ));
        }

        let mut map = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&definition.id) {
            return Err(WorkflowError::DuplicateDefinition(definition.id));
        }

        debug!(definition = %definition.id, "registered workflow definition");
        map.insert(definition.id.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<WorkflowDefinition>> {
        let removed = self
            .definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_some() {
            debug!(definition = %id, "unregistered workflow definition");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// All definitions, ordered by id.
    pub fn list(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
