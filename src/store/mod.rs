// src/store/mod.rs

//! Persistence and search index for workflow instances.
//!
//! The workflow service writes through [`WorkflowStore::update`] only; every
//! other method is read-only.

pub mod memory;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::Result;
use crate::model::{WorkflowInstance, WorkflowState};
use crate::types::WorkflowId;

pub use memory::InMemoryStore;

pub trait WorkflowStore: Send + Sync {
    /// Insert or replace an instance.
    fn update(&self, instance: &WorkflowInstance) -> Result<()>;

    fn get(&self, id: WorkflowId) -> Result<Option<WorkflowInstance>>;

    /// Returns whether an instance was removed.
    fn remove(&self, id: WorkflowId) -> Result<bool>;

    /// Instances in `state` (any state if `None`) whose current operation is
    /// `operation` (any if `None`).
    fn count_instances(
        &self,
        state: Option<WorkflowState>,
        operation: Option<&str>,
    ) -> Result<usize>;

    fn statistics(&self) -> Result<WorkflowStatistics>;

    fn query(&self, query: &WorkflowQuery) -> Result<Vec<WorkflowInstance>>;
}

/// Filter criteria for [`WorkflowStore::query`]. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowQuery {
    pub states: Vec<WorkflowState>,
    pub excluded_states: Vec<WorkflowState>,
    pub definition_id: Option<String>,
    pub media_package: Option<String>,
    pub series: Option<String>,
    pub current_operation: Option<String>,
    /// Case-insensitive substring of the title or media package title.
    pub text: Option<String>,
    pub start: usize,
    /// Zero means unlimited.
    pub count: usize,
}

impl WorkflowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: WorkflowState) -> Self {
        self.states.push(state);
        self
    }

    pub fn without_state(mut self, state: WorkflowState) -> Self {
        self.excluded_states.push(state);
        self
    }

    pub fn with_definition(mut self, id: impl Into<String>) -> Self {
        self.definition_id = Some(id.into());
        self
    }

    pub fn with_media_package(mut self, id: impl Into<String>) -> Self {
        self.media_package = Some(id.into());
        self
    }

    pub fn with_series(mut self, id: impl Into<String>) -> Self {
        self.series = Some(id.into());
        self
    }

    pub fn with_current_operation(mut self, template: impl Into<String>) -> Self {
        self.current_operation = Some(template.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_page(mut self, start: usize, count: usize) -> Self {
        self.start = start;
        self.count = count;
        self
    }

    pub fn matches(&self, instance: &WorkflowInstance) -> bool {
        if !self.states.is_empty() && !self.states.contains(&instance.state) {
            return false;
        }
        if self.excluded_states.contains(&instance.state) {
            return false;
        }
        if self
            .definition_id
            .as_ref()
            .is_some_and(|id| *id != instance.definition_id)
        {
            return false;
        }
        if self
            .media_package
            .as_ref()
            .is_some_and(|id| *id != instance.media_package.identifier)
        {
            return false;
        }
        if self
            .series
            .as_ref()
            .is_some_and(|s| instance.media_package.series.as_ref() != Some(s))
        {
            return false;
        }
        if let Some(template) = &self.current_operation {
            if instance.current_operation().map(|op| &op.template) != Some(template) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let in_title = instance.title.to_lowercase().contains(&needle);
            let in_mp = instance
                .media_package
                .title
                .as_ref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            if !in_title && !in_mp {
                return false;
            }
        }
        true
    }
}

/// Instance counts per state, overall and per definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowStatistics {
    pub total: usize,
    pub states: BTreeMap<WorkflowState, usize>,
    pub definitions: BTreeMap<String, DefinitionReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefinitionReport {
    pub total: usize,
    pub states: BTreeMap<WorkflowState, usize>,
    /// Non-terminal instances per current operation template.
    pub operations: BTreeMap<String, usize>,
}

impl WorkflowStatistics {
    pub fn record(&mut self, instance: &WorkflowInstance) {
        self.total += 1;
        *self.states.entry(instance.state).or_default() += 1;

        let report = self
            .definitions
            .entry(instance.definition_id.clone())
            .or_default();
        report.total += 1;
        *report.states.entry(instance.state).or_default() += 1;
        if !instance.state.is_terminal() {
            if let Some(op) = instance.current_operation() {
                *report.operations.entry(op.template.clone()).or_default() += 1;
            }
        }
    }

    pub fn count(&self, state: WorkflowState) -> usize {
        self.states.get(&state).copied().unwrap_or(0)
    }
}
