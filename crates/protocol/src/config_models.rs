//! Global configuration models for `.contentflow/config.toml`.
//!
//! This module defines the project-wide settings: where activity is
//! persisted, how long a run may take, and what each model costs.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use ts_rs::TS;

/// Where the tracker writes activity through to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum TrackingBackend {
    /// Tracking stays in memory for the duration of the run only.
    None,

    /// Shared in-process store, queryable while the process lives.
    Memory,

    /// One JSON document per run and per activity record on disk.
    #[default]
    Json,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct TrackingConfig {
    #[serde(default)]
    pub backend: TrackingBackend,

    /// Directory for the `json` backend, relative to the project root.
    #[serde(default = "default_tracking_directory")]
    pub directory: String,
}

fn default_tracking_directory() -> String {
    ".contentflow/runs".to_string()
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            backend: TrackingBackend::default(),
            directory: default_tracking_directory(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct OrchestratorSettings {
    /// Coarse run deadline, checked between stages.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

/// Price per thousand tokens for one model, in US dollars.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct ModelPricing {
    #[serde(default)]
    pub input_per_1k: f64,
    #[serde(default)]
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub fn estimate(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Represents global settings from `.contentflow/config.toml`.
///
/// # Example
///
/// ```toml
/// [tracking]
/// backend = "json"
/// directory = ".contentflow/runs"
///
/// [orchestrator]
/// run-timeout-secs = 900
///
/// [pricing.gpt-4o]
/// input-per-1k = 0.0025
/// output-per-1k = 0.01
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct GlobalConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    /// Per-model pricing, keyed by model identifier.
    #[serde(default)]
    pub pricing: BTreeMap<String, ModelPricing>,
}
