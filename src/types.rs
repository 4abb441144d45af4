// src/types.rs

use std::collections::BTreeMap;

/// Identifier of a workflow instance. Shared with its backing job.
pub type WorkflowId = u64;

/// Identifier of a dispatch job.
pub type JobId = u64;

/// String key/value property bag used for workflow configuration, handler
/// results and resume arguments.
pub type Properties = BTreeMap<String, String>;
