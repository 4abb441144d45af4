#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use mediaflow::errors::Result;
use mediaflow::model::{WorkflowInstance, WorkflowState};
use mediaflow::store::{InMemoryStore, WorkflowQuery, WorkflowStatistics, WorkflowStore};
use mediaflow::types::WorkflowId;

pub const STORE_FAILURE: &str = "store unavailable";

/// In-memory store whose writes can be made to fail.
///
/// Reads always go through to the wrapped store. Writes fail while the
/// failure budget is positive, one unit per failed write. Each error names
/// the failed write by its sequence number, starting at 1.
#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<InMemoryStore>,
    failures: AtomicUsize,
    failed_writes: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(0),
            failed_writes: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` calls to `update`.
    pub fn fail_next_updates(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    /// Fail every call to `update` from now on.
    pub fn fail_all_updates(&self) {
        self.fail_next_updates(usize::MAX);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                (left > 0).then(|| if left == usize::MAX { left } else { left - 1 })
            })
            .is_ok()
    }
}

impl WorkflowStore for FailingStore {
    fn update(&self, instance: &WorkflowInstance) -> Result<()> {
        if self.take_failure() {
            let n = self.failed_writes.fetch_add(1, Ordering::SeqCst) + 1;
            return Err(anyhow!("{STORE_FAILURE} (failed write {n})").into());
        }
        self.inner.update(instance)
    }

    fn get(&self, id: WorkflowId) -> Result<Option<WorkflowInstance>> {
        self.inner.get(id)
    }

    fn remove(&self, id: WorkflowId) -> Result<bool> {
        self.inner.remove(id)
    }

    fn count_instances(
        &self,
        state: Option<WorkflowState>,
        operation: Option<&str>,
    ) -> Result<usize> {
        self.inner.count_instances(state, operation)
    }

    fn statistics(&self) -> Result<WorkflowStatistics> {
        self.inner.statistics()
    }

    fn query(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowInstance>> {
        self.inner.query(query)
    }
}
