//! State management for pipeline runs.
//!
//! This module provides:
//! - Run state machine logic
//! - RunManager for coordinating concurrent runs

pub mod manager;
pub mod run;

pub use manager::RunManager;
