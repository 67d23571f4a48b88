//! # cf-protocol
//!
//! Shared data model for contentflow.
//!
//! This crate defines the structures exchanged between the orchestration
//! core and its consumers:
//! - Configuration file parsing (TOML settings, Markdown stages, YAML pipelines)
//! - Pipeline runs and their per-stage activity records
//! - Progress events emitted during execution
//!
//! ## Modules
//!
//! - [`activity_models`]: Activity records and their trace entries
//! - [`brief_models`]: The content brief a run is created from
//! - [`config_models`]: Global configuration from config.toml
//! - [`ipc`]: Progress events
//! - [`pipeline_models`]: Content-type to stage-sequence mapping
//! - [`run_models`]: Pipeline runs, summaries and timelines
//! - [`stage_models`]: Stage definitions
//!
//! ## Design Principles
//!
//! - Minimal dependencies: serde, ts-rs, uuid and chrono
//! - TypeScript generation: all types derive `TS` for UI consumers
//! - Independent compilation: no dependencies on other contentflow crates

pub mod activity_models;
pub mod brief_models;
pub mod config_models;
pub mod ipc;
pub mod pipeline_models;
pub mod run_models;
pub mod stage_models;

// Re-export all public types for convenience
pub use activity_models::*;
pub use brief_models::*;
pub use config_models::*;
pub use ipc::*;
pub use pipeline_models::*;
pub use run_models::*;
pub use stage_models::*;
