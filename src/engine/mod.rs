// src/engine/mod.rs

//! Workflow orchestration engine.
//!
//! [`WorkflowService`] is the state machine that moves a workflow instance
//! through its operations. It is split across:
//! - [`lifecycle`]: start, run, resume, stop, suspend, remove and the
//!   `process` entry point used by the dispatch layer
//! - [`execution`]: running one operation and applying its result or failure
//! - [`update`]: the single persistence path plus job status sync
//! - [`admission`]: advisory concurrency cap for new workflows
//! - [`worker`]: one handler call for the current operation
//! - [`listeners`]: asynchronous change notifications
//!
//! The service is synchronous and `Send + Sync`; share it through an `Arc`
//! and call it from as many threads as needed. Operations of one workflow
//! still run strictly in order because only one operation job per workflow
//! is ever queued.

use std::sync::Arc;

use crate::dispatch::{Job, JobDispatcher, JobProcessor};
use crate::errors::{Result, WorkflowError};
use crate::handler::{HandlerInfo, OperationHandler};
use crate::metadata::MetadataProviders;
use crate::model::{SystemProperties, WorkflowDefinition, WorkflowInstance, WorkflowState};
use crate::registry::{DefinitionRegistry, HandlerRegistry};
use crate::store::{WorkflowQuery, WorkflowStatistics, WorkflowStore};
use crate::types::WorkflowId;

pub mod admission;
pub mod execution;
pub mod lifecycle;
pub mod listeners;
pub mod update;
pub mod worker;

pub use listeners::{ListenerFanout, WorkflowListener};
pub use worker::OperationWorker;

/// Service-wide settings.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    /// Cap on running workflows. `None` defers to the dispatcher's
    /// `max_load`.
    pub max_concurrent_workflows: Option<usize>,
    /// Fallback for `${key}` placeholders.
    pub system: SystemProperties,
}

pub struct WorkflowService {
    options: ServiceOptions,
    definitions: DefinitionRegistry,
    handlers: HandlerRegistry,
    dispatcher: Arc<dyn JobDispatcher>,
    store: Arc<dyn WorkflowStore>,
    metadata: MetadataProviders,
    listeners: ListenerFanout,
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("options", &self.options)
            .field("definitions", &self.definitions)
            .field("handlers", &self.handlers)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl WorkflowService {
    pub fn new(
        dispatcher: Arc<dyn JobDispatcher>,
        store: Arc<dyn WorkflowStore>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            options,
            definitions: DefinitionRegistry::new(),
            handlers: HandlerRegistry::new(),
            dispatcher,
            store,
            metadata: MetadataProviders::new(),
            listeners: ListenerFanout::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataProviders) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn add_listener(&self, listener: Arc<dyn WorkflowListener>) -> Result<()> {
        self.listeners.add(listener)
    }

    // ---- definitions -----------------------------------------------------

    pub fn register_definition(&self, definition: WorkflowDefinition) -> Result<()> {
        self.definitions.register(definition)
    }

    pub fn unregister_definition(&self, id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.definitions.unregister(id)
    }

    pub fn get_definition(&self, id: &str) -> Result<Arc<WorkflowDefinition>> {
        self.definitions
            .get(id)
            .ok_or_else(|| WorkflowError::DefinitionNotFound(id.to_string()))
    }

    pub fn list_definitions(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.definitions.list()
    }

    // ---- handlers --------------------------------------------------------

    pub fn register_handler(&self, handler: Arc<dyn OperationHandler>) -> Result<()> {
        self.handlers.register(handler)
    }

    pub fn list_operation_handlers(&self) -> Vec<HandlerInfo> {
        self.handlers.handlers()
    }

    pub fn is_runnable(&self, definition: &WorkflowDefinition) -> bool {
        self.handlers.is_runnable(definition, &self.definitions)
    }

    // ---- queries ---------------------------------------------------------

    pub fn get_workflow(&self, id: WorkflowId) -> Result<WorkflowInstance> {
        self.store
            .get(id)?
            .ok_or(WorkflowError::WorkflowNotFound(id))
    }

    pub fn get_workflows(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowInstance>> {
        self.store.query(query)
    }

    pub fn count_workflow_instances(
        &self,
        state: Option<WorkflowState>,
        operation: Option<&str>,
    ) -> Result<usize> {
        self.store.count_instances(state, operation)
    }

    pub fn get_statistics(&self) -> Result<WorkflowStatistics> {
        self.store.statistics()
    }
}

impl JobProcessor for WorkflowService {
    fn is_ready_to_accept(&self, job: &Job) -> bool {
        WorkflowService::is_ready_to_accept(self, job)
    }

    fn process(&self, job: Job) -> Result<()> {
        WorkflowService::process(self, job)
    }
}
