// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::DispatchOptions;
use crate::engine::ServiceOptions;
use crate::model::{SystemProperties, WorkflowDefinition};
use crate::types::Properties;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [service]
/// max_concurrent_workflows = 4
/// include_environment = true
///
/// [dispatch]
/// workers = 4
/// retry_interval_ms = 250
///
/// [properties]
/// "server.url" = "http://localhost:8080"
///
/// [workflow.publish]
/// title = "Publish"
///
/// [[workflow.publish.operation]]
/// template = "defaults"
/// fail_on_error = true
/// exception_handler_workflow = "cleanup"
/// ```
///
/// All sections are optional and have reasonable defaults; at least one
/// workflow is required by validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    /// System properties used as `${key}` fallback.
    #[serde(default)]
    pub properties: Properties,

    /// Workflow definitions keyed by id.
    #[serde(default)]
    pub workflow: BTreeMap<String, WorkflowDefinition>,
}

/// `[service]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    /// Cap on concurrently running workflows. Unset means the dispatcher's
    /// maximum load.
    #[serde(default)]
    pub max_concurrent_workflows: Option<usize>,

    /// Fall back to environment variables for `${key}` placeholders.
    #[serde(default = "default_include_environment")]
    pub include_environment: bool,
}

fn default_include_environment() -> bool {
    true
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            max_concurrent_workflows: None,
            include_environment: default_include_environment(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    /// Jobs processed in parallel.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Delay before a job refused by admission control is offered again.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Load reported by the dispatcher. Defaults to `workers`.
    #[serde(default)]
    pub max_load: Option<usize>,
}

fn default_workers() -> usize {
    4
}

fn default_retry_interval_ms() -> u64 {
    250
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry_interval_ms: default_retry_interval_ms(),
            max_load: None,
        }
    }
}

/// Validated configuration. Built via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub service: ServiceSection,
    pub dispatch: DispatchSection,
    pub properties: Properties,
    /// Definitions keyed by id; every definition's `id` matches its key.
    pub workflows: BTreeMap<String, WorkflowDefinition>,
}

impl ConfigFile {
    /// Used by validation once invariants are checked. Fills in definition
    /// ids and default titles from the table keys.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let workflows = raw
            .workflow
            .into_iter()
            .map(|(id, mut definition)| {
                definition.id = id.clone();
                if definition.title.trim().is_empty() {
                    definition.title = id.clone();
                }
                (id, definition)
            })
            .collect();

        Self {
            service: raw.service,
            dispatch: raw.dispatch,
            properties: raw.properties,
            workflows,
        }
    }

    pub fn system_properties(&self) -> SystemProperties {
        SystemProperties::new(self.properties.clone(), self.service.include_environment)
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            max_concurrent_workflows: self.service.max_concurrent_workflows,
            system: self.system_properties(),
        }
    }

    pub fn dispatch_options(&self, exit_when_idle: bool) -> DispatchOptions {
        DispatchOptions {
            workers: self.dispatch.workers,
            retry_interval: Duration::from_millis(self.dispatch.retry_interval_ms),
            exit_when_idle,
        }
    }

    pub fn max_load(&self) -> usize {
        self.dispatch.max_load.unwrap_or(self.dispatch.workers)
    }
}
