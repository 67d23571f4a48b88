//! Stage registry.
//!
//! The `StageRegistry` is responsible for:
//! - Building stage adapters from their definitions
//! - Looking up stages by name
//! - Resolving a pipeline's stage names to adapters

use crate::engine::PipelineError;
use crate::stages::base::Stage;
use crate::stages::factory::StageFactory;
use anyhow::Result;
use cf_protocol::pipeline_models::PipelineDefinition;
use cf_protocol::stage_models::StageDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// All stages known to the orchestrator, keyed by name.
#[derive(Default, Clone)]
pub struct StageRegistry {
    stages: HashMap<String, Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one adapter per definition.
    ///
    /// # Errors
    ///
    /// Fails if any definition cannot be turned into an adapter.
    pub fn from_definitions(definitions: &[StageDefinition]) -> Result<Self> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(StageFactory::create(definition)?);
        }
        Ok(registry)
    }

    /// Register a stage under its own name, replacing any previous one.
    pub fn register(&mut self, stage: Arc<dyn Stage>) {
        self.stages.insert(stage.name().to_string(), stage);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Stage>> {
        self.stages.get(name).cloned()
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Registered stage names, sorted.
    pub fn list_stages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stages.keys().cloned().collect();
        names.sort();
        names
    }

    /// Map a pipeline's stage names to registered adapters, in order.
    pub fn resolve(
        &self,
        pipeline: &PipelineDefinition,
    ) -> std::result::Result<Vec<Arc<dyn Stage>>, PipelineError> {
        pipeline
            .stages
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| PipelineError::UnknownStage {
                    content_type: pipeline.content_type.clone(),
                    stage: name.clone(),
                })
            })
            .collect()
    }
}
