//! Stage factory for creating stage adapters from definitions.

use crate::stages::adapters::{CommandStage, ScriptedStage};
use crate::stages::base::Stage;
use anyhow::{anyhow, Result};
use cf_protocol::stage_models::{StageDefinition, StageKind};
use std::sync::Arc;

/// Factory for creating stage instances based on configuration.
///
/// The adapter is picked from the definition's `kind`:
/// - `scripted` → [`ScriptedStage`]
/// - `command` → [`CommandStage`], which requires a `command` block
pub struct StageFactory;

impl StageFactory {
    pub fn create(definition: &StageDefinition) -> Result<Arc<dyn Stage>> {
        match definition.kind {
            StageKind::Scripted => Ok(Arc::new(ScriptedStage::from_definition(definition))),
            StageKind::Command => {
                let stage = CommandStage::from_definition(definition).ok_or_else(|| {
                    anyhow!(
                        "Stage '{}' has kind 'command' but no command block",
                        definition.name
                    )
                })?;
                Ok(Arc::new(stage))
            }
        }
    }
}
