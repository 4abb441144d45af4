// src/registry/mod.rs

//! Explicit registries owned by the workflow service.

pub mod definitions;
pub mod handlers;

pub use definitions::DefinitionRegistry;
pub use handlers::HandlerRegistry;
