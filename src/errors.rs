// src/errors.rs

//! Crate-wide error types.
//!
//! Errors fall into three groups:
//! - [`OperationError`]: raised by operation handlers. Expected; it drives
//!   the FAILING/FAILED transitions and is surfaced as
//!   [`WorkflowError::OperationFailed`] by the worker.
//! - [`Fault`]: an invariant of the state machine was violated. Never
//!   retried; [`WorkflowError::is_fatal`] reports it.
//! - everything else: caller, configuration, persistence and dispatch
//!   errors.

use thiserror::Error;

use crate::types::{JobId, WorkflowId};

/// Error raised by an operation handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    message: String,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for OperationError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<std::io::Error> for OperationError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Invariant violation inside the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Fault(pub String);

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Fault(message.into())
    }
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid media package: {0}")]
    InvalidMediaPackage(String),

    #[error("Workflow definition '{0}' is already registered")]
    DuplicateDefinition(String),

    #[error("Workflow definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Operation handler '{0}' is already registered")]
    DuplicateHandler(String),

    #[error("Workflow instance not found: {0}")]
    WorkflowNotFound(WorkflowId),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Illegal workflow state: {0}")]
    IllegalState(String),

    #[error("Operation '{template}' at position {position} failed: {source}")]
    OperationFailed {
        position: usize,
        template: String,
        #[source]
        source: OperationError,
    },

    #[error("Invariant violated: {0}")]
    Fault(#[from] Fault),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Whether the error indicates a bug in the state machine rather than a
    /// recoverable condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkflowError::Fault(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WorkflowError>;
