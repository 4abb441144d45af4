#![allow(dead_code)]

use std::sync::Arc;

use mediaflow::dispatch::{InMemoryDispatcher, Job, JobDispatcher, JobStatus};
use mediaflow::engine::{ServiceOptions, WorkflowService};
use mediaflow::errors::Result;
use mediaflow::handler::OperationHandler;
use mediaflow::model::{MediaPackage, WorkflowDefinition, WorkflowInstance};
use mediaflow::store::{InMemoryStore, WorkflowStore};
use mediaflow::types::{Properties, WorkflowId};

use crate::failing_store::FailingStore;

/// A job run by [`TestService::run_next`] and how it ended.
#[derive(Debug)]
pub struct ProcessedJob {
    pub job: Job,
    pub result: Result<()>,
}

/// Workflow service over in-memory collaborators, driven synchronously.
///
/// Instead of the async dispatch loop, tests call [`TestService::run_next`]
/// or [`TestService::run_until_idle`], which claim queued jobs in creation
/// order on the calling thread.
pub struct TestService {
    pub service: Arc<WorkflowService>,
    pub dispatcher: Arc<InMemoryDispatcher>,
    pub store: Arc<InMemoryStore>,
}

impl TestService {
    pub fn new() -> Self {
        Self::with_options(ServiceOptions::default(), usize::MAX)
    }

    pub fn with_options(options: ServiceOptions, max_load: usize) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::over_store(store.clone(), store, options, max_load)
    }

    /// Service whose store writes fail on demand. `store` still reads the
    /// instances that made it through.
    pub fn with_failing_store() -> (Self, Arc<FailingStore>) {
        let store = Arc::new(InMemoryStore::new());
        let failing = Arc::new(FailingStore::new(store.clone()));
        let ts = Self::over_store(
            store,
            failing.clone(),
            ServiceOptions::default(),
            usize::MAX,
        );
        (ts, failing)
    }

    fn over_store(
        store: Arc<InMemoryStore>,
        backend: Arc<dyn WorkflowStore>,
        options: ServiceOptions,
        max_load: usize,
    ) -> Self {
        let dispatcher = Arc::new(InMemoryDispatcher::new(max_load));
        let service = Arc::new(WorkflowService::new(dispatcher.clone(), backend, options));
        Self {
            service,
            dispatcher,
            store,
        }
    }

    pub fn handler(&self, handler: impl OperationHandler + 'static) -> &Self {
        self.service
            .register_handler(Arc::new(handler))
            .expect("register handler");
        self
    }

    pub fn define(&self, definition: WorkflowDefinition) -> &Self {
        self.service
            .register_definition(definition)
            .expect("register definition");
        self
    }

    pub fn start(&self, definition: &str, media_package: MediaPackage) -> WorkflowInstance {
        self.start_with(definition, media_package, Properties::new())
    }

    pub fn start_with(
        &self,
        definition: &str,
        media_package: MediaPackage,
        properties: Properties,
    ) -> WorkflowInstance {
        let definition = self.service.get_definition(definition).expect("definition");
        self.service
            .start(&definition, media_package, None, properties)
            .expect("start workflow")
    }

    pub fn workflow(&self, id: WorkflowId) -> WorkflowInstance {
        self.service.get_workflow(id).expect("workflow")
    }

    /// Claim and process the oldest queued job the service accepts.
    /// Failures are recorded on the job the way the dispatch loop does.
    pub fn run_next(&self) -> Option<ProcessedJob> {
        let job = self
            .dispatcher
            .queued_jobs()
            .into_iter()
            .find(|job| self.service.is_ready_to_accept(job))?;
        let job = self.dispatcher.claim(job.id).expect("claim")?;

        let result = self.service.process(job.clone());
        if result.is_err() {
            let mut failed = self.dispatcher.get_job(job.id).expect("job");
            if !failed.status.is_terminal() {
                failed.status = JobStatus::Failed;
                self.dispatcher.update_job(&failed).expect("update job");
            }
        }
        Some(ProcessedJob { job, result })
    }

    /// Process jobs until nothing accepted is queued.
    pub fn run_until_idle(&self) -> Vec<ProcessedJob> {
        let mut processed = Vec::new();
        while let Some(job) = self.run_next() {
            processed.push(job);
            assert!(processed.len() < 10_000, "jobs keep getting queued");
        }
        processed
    }

    /// Like [`Self::run_until_idle`], asserting that every job succeeded.
    pub fn drain(&self) {
        for job in self.run_until_idle() {
            if let Err(err) = job.result {
                panic!("job {} ({}) failed: {err}", job.job.id, job.job.operation);
            }
        }
    }
}

impl Default for TestService {
    fn default() -> Self {
        Self::new()
    }
}
