// src/model/mod.rs

//! Workflow and operation instance model.
//!
//! Pure data plus the `${key}` substitution logic. Nothing in here talks to
//! the dispatcher, the store or a handler.

pub mod definition;
pub mod instance;
pub mod media_package;
pub mod operation;
pub mod result;
pub mod state;
pub mod substitution;

pub use definition::{OperationDefinition, WorkflowDefinition};
pub use instance::WorkflowInstance;
pub use media_package::{ElementKind, MediaPackage, MediaPackageElement};
pub use operation::OperationInstance;
pub use result::OperationResult;
pub use state::{Action, OperationState, WorkflowState};
pub use substitution::{substitute, substitute_values, SystemProperties};
