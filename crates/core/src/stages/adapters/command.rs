//! Adapter for stages backed by an external generator process.
//!
//! The process receives one JSON request on stdin:
//!
//! ```json
//! {"stage": "draft", "prompt": "...", "model": "gpt-4o",
//!  "brief": {...}, "prior_outputs": {"outline": {...}}}
//! ```
//!
//! and writes NDJSON directives to stdout, each tagged by `type`. Trace
//! directives are forwarded to the tracker as they arrive; exactly one
//! `output` directive carries the stage result.

use crate::stages::base::{PriorOutputs, Stage, StageError, StageOutput};
use crate::stages::executor::{CommandExecutor, Invocation};
use crate::tracker::StageScope;
use async_trait::async_trait;
use cf_protocol::activity_models::{ContentChange, ContentPair, KnowledgeUsage};
use cf_protocol::brief_models::ContentBrief;
use cf_protocol::stage_models::{CommandSpec, StageDefinition};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_stream::StreamExt;

/// One line of a generator's stdout.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    Decision {
        description: String,
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    Knowledge(KnowledgeUsage),
    ContentPair(ContentPair),
    Change(ContentChange),
    ModelUsage {
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        input_tokens: u64,
        #[serde(default)]
        output_tokens: u64,
        #[serde(default)]
        cost: Option<f64>,
    },
    Badge {
        label: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
    Output {
        #[serde(default)]
        summary: serde_json::Value,
        #[serde(default)]
        payload: serde_json::Value,
        #[serde(default)]
        quality: Option<BTreeMap<String, f64>>,
    },
}

pub struct CommandStage {
    name: String,
    tag: String,
    model: String,
    inputs: Vec<String>,
    prompt: String,
    command: CommandSpec,
}

impl CommandStage {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        let name = name.into();
        Self {
            tag: name.clone(),
            name,
            model: String::new(),
            inputs: Vec::new(),
            prompt: String::new(),
            command,
        }
    }

    /// Build from a stage definition. Returns `None` without a `command` block.
    pub fn from_definition(definition: &StageDefinition) -> Option<Self> {
        let command = definition.command.clone()?;
        Some(Self {
            name: definition.name.clone(),
            tag: definition.tag().to_string(),
            model: definition.model.clone(),
            inputs: definition.inputs.clone(),
            prompt: definition.prompt.clone(),
            command,
        })
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    fn request(&self, brief: &ContentBrief, prior: &PriorOutputs) -> serde_json::Value {
        serde_json::json!({
            "stage": self.name,
            "prompt": self.prompt,
            "model": self.model,
            "brief": brief,
            "prior_outputs": prior.to_json(),
        })
    }

    fn invocation(&self) -> Invocation {
        Invocation {
            program: self.command.program.clone(),
            args: self.command.args.clone(),
            working_dir: self.command.working_dir.as_ref().map(PathBuf::from),
        }
    }

    async fn apply(&self, scope: &mut StageScope<'_>, directive: Directive) -> Option<StageOutput> {
        match directive {
            Directive::Decision { description, data } => scope.log_decision(description, data).await,
            Directive::Knowledge(usage) => scope.log_knowledge_usage(usage).await,
            Directive::ContentPair(pair) => scope.record_content_pair(pair.before, pair.after).await,
            Directive::Change(change) => scope.log_content_change(change).await,
            Directive::ModelUsage {
                model,
                input_tokens,
                output_tokens,
                cost,
            } => {
                let model = model.unwrap_or_else(|| self.model.clone());
                scope
                    .log_model_usage(&model, input_tokens, output_tokens, cost)
                    .await
            }
            Directive::Badge { label } => scope.add_badge(label).await,
            Directive::Warning { message } => scope.add_warning(message).await,
            Directive::Error { message } => scope.add_error(message).await,
            Directive::Output {
                summary,
                payload,
                quality,
            } => {
                let mut output = StageOutput::new(payload).with_summary(summary);
                output.quality = quality;
                return Some(output);
            }
        }
        None
    }
}

#[async_trait]
impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    async fn check_availability(&self) -> bool {
        which::which(&self.command.program).is_ok()
    }

    async fn execute(
        &self,
        scope: &mut StageScope<'_>,
        brief: &ContentBrief,
        prior: &PriorOutputs,
    ) -> Result<StageOutput, StageError> {
        let mut stream = CommandExecutor::execute(self.invocation(), self.request(brief, prior));
        let mut output = None;

        while let Some(item) = stream.next().await {
            let value = item?;
            let directive: Directive = serde_json::from_value(value.clone()).map_err(|e| {
                StageError::MalformedOutput(format!("Unrecognized directive {}: {}", value, e))
            })?;

            if let Some(result) = self.apply(scope, directive).await {
                if output.is_some() {
                    return Err(StageError::MalformedOutput(format!(
                        "Stage '{}' emitted more than one output",
                        self.name
                    )));
                }
                output = Some(result);
            }
        }

        output.ok_or_else(|| {
            StageError::MalformedOutput(format!("Stage '{}' produced no output", self.name))
        })
    }
}
