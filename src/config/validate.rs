// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WorkflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WorkflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_workflows(cfg)?;
    validate_service_config(cfg)?;
    validate_operations(cfg)?;
    validate_exception_handlers(cfg)?;
    warn_on_handler_cycles(cfg);
    Ok(())
}

fn ensure_has_workflows(cfg: &RawConfigFile) -> Result<()> {
    if cfg.workflow.is_empty() {
        return Err(WorkflowError::ConfigError(
            "config must contain at least one [workflow.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_service_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.dispatch.workers == 0 {
        return Err(WorkflowError::ConfigError(
            "[dispatch].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.service.max_concurrent_workflows == Some(0) {
        return Err(WorkflowError::ConfigError(
            "[service].max_concurrent_workflows must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_operations(cfg: &RawConfigFile) -> Result<()> {
    for (id, definition) in &cfg.workflow {
        if definition.operations.is_empty() {
            return Err(WorkflowError::ConfigError(format!(
                "workflow '{id}' must define at least one [[workflow.{id}.operation]]"
            )));
        }
        for (position, op) in definition.operations.iter().enumerate() {
            if op.template.trim().is_empty() {
                return Err(WorkflowError::ConfigError(format!(
                    "operation {position} of workflow '{id}' has an empty template"
                )));
            }
        }
    }
    Ok(())
}

fn validate_exception_handlers(cfg: &RawConfigFile) -> Result<()> {
    for (id, definition) in &cfg.workflow {
        for handler in definition.exception_handlers() {
            if !cfg.workflow.contains_key(handler) {
                return Err(WorkflowError::ConfigError(format!(
                    "workflow '{id}' references unknown exception handler workflow '{handler}'"
                )));
            }
        }
    }
    Ok(())
}

/// Exception handler workflows that (transitively) reference each other are
/// legal but usually a mistake.
fn warn_on_handler_cycles(cfg: &RawConfigFile) {
    // Edge direction: workflow -> its exception handler workflow.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in cfg.workflow.keys() {
        graph.add_node(id.as_str());
    }
    for (id, definition) in &cfg.workflow {
        for handler in definition.exception_handlers() {
            graph.add_edge(id.as_str(), handler, ());
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        warn!(
            workflow = %cycle.node_id(),
            "exception handler workflows reference each other in a cycle"
        );
    }
}
