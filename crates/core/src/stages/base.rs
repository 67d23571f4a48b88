//! Base Stage trait and supporting types.

use crate::tracker::StageScope;
use async_trait::async_trait;
use cf_protocol::brief_models::ContentBrief;
use std::collections::BTreeMap;
use thiserror::Error;

/// What a stage hands back to the orchestrator on success.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// Small snapshot recorded on the activity record.
    pub summary: serde_json::Value,

    /// Full output, made available to downstream stages.
    pub payload: serde_json::Value,

    /// Quality sub-scores merged into the record's metrics.
    pub quality: Option<BTreeMap<String, f64>>,
}

impl StageOutput {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            summary: serde_json::Value::Null,
            payload,
            quality: None,
        }
    }

    pub fn with_summary(mut self, summary: serde_json::Value) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_quality(mut self, quality: BTreeMap<String, f64>) -> Self {
        self.quality = Some(quality);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("Stage not available: {0}")]
    NotAvailable(String),
    #[error("Stage '{stage}' requires output of '{input}', which no earlier stage produced")]
    MissingInput { stage: String, input: String },
    #[error("Execution failed: {0}")]
    Execution(String),
    #[error("Malformed structured output: {0}")]
    MalformedOutput(String),
}

/// Outputs of the stages that already completed in this run.
///
/// Stages receive it by shared reference: they can read what earlier stages
/// produced but cannot change it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorOutputs {
    outputs: BTreeMap<String, serde_json::Value>,
    order: Vec<String>,
}

impl PriorOutputs {
    pub fn get(&self, stage: &str) -> Option<&serde_json::Value> {
        self.outputs.get(stage)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.outputs.contains_key(stage)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Stage names in completion order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// First declared input that no earlier stage produced.
    pub fn first_missing<'a>(&self, inputs: &'a [String]) -> Option<&'a str> {
        inputs
            .iter()
            .find(|input| !self.contains(input))
            .map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.outputs
                .iter()
                .map(|(name, payload)| (name.clone(), payload.clone()))
                .collect(),
        )
    }

    pub(crate) fn insert(&mut self, stage: &str, payload: serde_json::Value) {
        if self.outputs.insert(stage.to_string(), payload).is_none() {
            self.order.push(stage.to_string());
        }
    }
}

/// Contract every content-generation stage implements.
///
/// The orchestrator only relies on the declared name, tag and inputs; how a
/// stage produces its output is its own business. A stage must not keep the
/// scope after `execute` returns, which the borrow on `scope` enforces.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Category recorded on the activity record.
    fn tag(&self) -> &str {
        self.name()
    }

    /// Names of earlier stages whose outputs this stage reads.
    fn inputs(&self) -> &[String] {
        &[]
    }

    async fn check_availability(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        scope: &mut StageScope<'_>,
        brief: &ContentBrief,
        prior: &PriorOutputs,
    ) -> Result<StageOutput, StageError>;
}
