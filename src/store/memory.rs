// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::errors::Result;
use crate::model::{WorkflowInstance, WorkflowState};
use crate::store::{WorkflowQuery, WorkflowStatistics, WorkflowStore};
use crate::types::WorkflowId;

/// Document store keeping every instance as a JSON string.
///
/// Reads always deserialize a fresh copy, so callers never share state with
/// the store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: Mutex<BTreeMap<WorkflowId, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<WorkflowId, String>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn all(&self) -> Result<Vec<WorkflowInstance>> {
        let documents = self.lock();
        documents
            .values()
            .map(|doc| serde_json::from_str::<WorkflowInstance>(doc).map_err(Into::into))
            .collect()
    }
}

impl WorkflowStore for InMemoryStore {
    fn update(&self, instance: &WorkflowInstance) -> Result<()> {
        let document = serde_json::to_string(instance)?;
        trace!(workflow = instance.id, bytes = document.len(), "storing workflow");
        self.lock().insert(instance.id, document);
        Ok(())
    }

    fn get(&self, id: WorkflowId) -> Result<Option<WorkflowInstance>> {
        let documents = self.lock();
        documents
            .get(&id)
            .map(|doc| serde_json::from_str::<WorkflowInstance>(doc))
            .transpose()
            .map_err(Into::into)
    }

    fn remove(&self, id: WorkflowId) -> Result<bool> {
        Ok(self.lock().remove(&id).is_some())
    }

    fn count_instances(
        &self,
        state: Option<WorkflowState>,
        operation: Option<&str>,
    ) -> Result<usize> {
        Ok(self
            .all()?
            .iter()
            .filter(|w| state.is_none_or(|s| w.state == s))
            .filter(|w| {
                operation.is_none_or(|name| {
                    w.current_operation().is_some_and(|op| op.template == name)
                })
            })
            .count())
    }

    fn statistics(&self) -> Result<WorkflowStatistics> {
        let mut stats = WorkflowStatistics::default();
        for instance in self.all()? {
            stats.record(&instance);
        }
        Ok(stats)
    }

    fn query(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowInstance>> {
        let matching = self.all()?.into_iter().filter(|w| query.matches(w)).skip(query.start);
        Ok(if query.count == 0 {
            matching.collect()
        } else {
            matching.take(query.count).collect()
        })
    }
}
