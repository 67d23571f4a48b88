//! Configuration models that aggregate all settings.
//!
//! This module provides the unified `AppConfig` structure that combines
//! global settings, stage definitions, and pipeline definitions into a
//! single configuration object.

use cf_protocol::config_models::GlobalConfig;
use cf_protocol::pipeline_models::PipelineDefinition;
use cf_protocol::stage_models::StageDefinition;

/// Unified application configuration loaded from `.contentflow/` directory.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Global settings
/// - `stages/*.md`: Stage definitions
/// - `pipelines/*.yaml`: Pipeline definitions
///
/// # Example
///
/// ```rust,no_run
/// use cf_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} stages and {} pipelines",
///          config.stages.len(),
///          config.pipelines.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// All stage definitions loaded from `stages/*.md`, sorted by file name.
    pub stages: Vec<StageDefinition>,

    /// All pipeline definitions loaded from `pipelines/*.yaml`, sorted by file name.
    pub pipelines: Vec<PipelineDefinition>,
}

impl AppConfig {
    pub fn stage(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    pub fn pipeline(&self, content_type: &str) -> Option<&PipelineDefinition> {
        self.pipelines
            .iter()
            .find(|pipeline| pipeline.content_type == content_type)
    }
}
