//! Initialization module for creating `.contentflow` directory structures.
//!
//! This module provides functionality to initialize a new contentflow project
//! by generating a `.contentflow/` directory with pre-configured templates for:
//! - Global configuration (`config.toml`)
//! - Stage definitions (`stages/*.md`)
//! - Pipelines (`pipelines/*.yaml`)
//!
//! # Example
//!
//! ```no_run
//! use cf_core::init::{InitOptions, generate_contentflow_structure};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! generate_contentflow_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_contentflow_structure, InitOptions};
pub use templates::{get_template, list_templates};
