//! # cf-core
//!
//! Pipeline orchestration and activity tracking for contentflow.
//!
//! This crate provides:
//! - Configuration loading from the `.contentflow/` directory
//! - The stage adapter contract and the built-in adapters
//! - The activity tracker that records what every stage did
//! - Persistence sinks and the query interface over stored runs
//! - The pipeline orchestrator and the run aggregator
//! - Background management of concurrent runs
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`stages`]: Stage trait, registry and adapter implementations
//! - [`tracker`]: Activity tracker and per-stage tracking scopes
//! - [`store`]: Persistence sinks and run queries
//! - [`engine`]: Pipeline orchestrator
//! - [`aggregate`]: Run summaries and timelines
//! - [`state`]: Run state transitions and the run manager
//! - [`report`]: Report renderer interface
//! - [`init`]: `.contentflow/` scaffolding

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod init;
pub mod report;
pub mod stages;
pub mod state;
pub mod store;
pub mod tracker;
