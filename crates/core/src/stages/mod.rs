//! Stage abstraction and management.
//!
//! This module provides the `Stage` trait (Adapter Pattern), the built-in
//! adapters, and the `StageRegistry` the orchestrator resolves pipelines
//! against.

pub mod adapters;
pub mod base;
pub mod executor;
pub mod factory;
pub mod registry;

pub use adapters::{CommandStage, ScriptedStage};
pub use base::{PriorOutputs, Stage, StageError, StageOutput};
pub use factory::StageFactory;
pub use registry::StageRegistry;
