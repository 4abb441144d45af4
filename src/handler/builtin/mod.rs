// src/handler/builtin/mod.rs

//! Utility handlers that ship with the engine.
//!
//! Real media processing (encoding, distribution, publication) lives outside
//! this crate; these cover the generic steps a pipeline definition needs.

mod defaults;
mod execute;
mod hold;

use std::sync::Arc;

pub use defaults::DefaultsHandler;
pub use execute::ExecuteHandler;
pub use hold::HoldHandler;

use crate::handler::OperationHandler;

/// All built-in handlers, ready to be registered.
pub fn all() -> Vec<Arc<dyn OperationHandler>> {
    vec![
        Arc::new(DefaultsHandler),
        Arc::new(HoldHandler),
        Arc::new(ExecuteHandler),
    ]
}
